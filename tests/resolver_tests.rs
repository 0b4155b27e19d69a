use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

use hazel_dns::{MemoryStore, ResolveError, Resolver, ResolverConfig};
use hickory_proto::op::Query;
use hickory_proto::rr::rdata::{A, AAAA};
use hickory_proto::rr::{Name, RData, Record, RecordType};

mod support;
use support::{FailingStore, disco_zone, name, resolver, subscribe};

fn data(records: &[Record]) -> Vec<String> {
    records.iter().map(|r| r.data().to_string()).collect()
}

fn types(records: &[Record]) -> Vec<RecordType> {
    records.iter().map(Record::record_type).collect()
}

#[tokio::test]
async fn authority_for_zone_apex() {
    subscribe();
    let resolver = resolver(disco_zone("TestAuthorityRoot"), "TestAuthorityRoot/");

    let answer = resolver
        .resolve(&name("disco.net."), RecordType::A)
        .await
        .unwrap();

    assert!(answer.answers().is_empty());
    assert_eq!(answer.authority().len(), 1);
    let soa = &answer.authority()[0];
    assert_eq!(soa.record_type(), RecordType::SOA);
    assert_eq!(soa.name(), &name("disco.net."));
}

#[tokio::test]
async fn authority_for_name_inside_zone() {
    subscribe();
    let resolver = resolver(disco_zone("TestAuthorityDomain"), "TestAuthorityDomain/");

    let answer = resolver
        .resolve(&name("nothing.here.disco.net."), RecordType::A)
        .await
        .unwrap();

    assert!(answer.answers().is_empty());
    assert_eq!(types(answer.authority()), vec![RecordType::SOA]);
    assert_eq!(answer.authority()[0].name(), &name("disco.net."));
}

#[tokio::test]
async fn soa_fields() {
    subscribe();
    let resolver = resolver(disco_zone(""), "");

    let answer = resolver
        .resolve(&name("disco.net."), RecordType::SOA)
        .await
        .unwrap();

    assert!(answer.authority().is_empty());
    let [record] = answer.answers() else {
        panic!("expected one SOA, got {:?}", answer.answers());
    };
    let RData::SOA(soa) = record.data() else {
        panic!("expected SOA data, got {:?}", record.data());
    };
    assert_eq!(soa.mname(), &name("ns1.disco.net."));
    assert_eq!(soa.rname(), &name("admin.disco.net."));
    assert_eq!(soa.serial(), 0);
    assert_eq!(soa.refresh(), 3600);
    assert_eq!(soa.retry(), 600);
    assert_eq!(soa.expire(), 86400);
    assert_eq!(soa.minimum(), 10);
}

#[tokio::test]
async fn soa_timers_above_i32_max() {
    subscribe();
    let store = MemoryStore::new();
    store.set(
        "/net/disco/.SOA",
        "ns1.disco.net.\tadmin.disco.net.\t3600\t600\t3000000000\t10",
    );
    let resolver = resolver(store, "");

    let answer = resolver
        .resolve(&name("disco.net."), RecordType::SOA)
        .await
        .unwrap();
    let [record] = answer.answers() else {
        panic!("expected one SOA, got {:?}", answer.answers());
    };
    let RData::SOA(soa) = record.data() else {
        panic!("expected SOA data, got {:?}", record.data());
    };
    assert_eq!(soa.expire() as u32, 3_000_000_000);

    let answer = resolver
        .resolve(&name("bar.disco.net."), RecordType::A)
        .await
        .unwrap();
    assert_eq!(types(answer.authority()), vec![RecordType::SOA]);
}

#[tokio::test]
async fn answer_a() {
    subscribe();
    let resolver = resolver(disco_zone("TestAnswerA"), "TestAnswerA/");

    let answer = resolver
        .resolve(&name("bar.disco.net."), RecordType::A)
        .await
        .unwrap();

    assert!(answer.authority().is_empty());
    let [record] = answer.answers() else {
        panic!("expected one answer, got {:?}", answer.answers());
    };
    assert_eq!(record.name(), &name("bar.disco.net."));
    assert_eq!(record.data(), &RData::A(A(Ipv4Addr::new(1, 2, 3, 4))));
    assert_eq!(record.ttl(), 300);
}

#[tokio::test]
async fn answer_aaaa() {
    subscribe();
    let resolver = resolver(disco_zone("TestAnswerAAAA"), "TestAnswerAAAA/");

    let answer = resolver
        .resolve(&name("bar.disco.net."), RecordType::AAAA)
        .await
        .unwrap();

    assert!(answer.authority().is_empty());
    assert_eq!(
        answer.answers().iter().map(Record::data).collect::<Vec<_>>(),
        vec![&RData::AAAA(AAAA(Ipv6Addr::LOCALHOST))]
    );
}

// Types are answered in ascending type-code order (A before TXT), whatever
// order their markers were written in.
#[tokio::test]
async fn answer_any_in_type_code_order() {
    subscribe();
    let resolver = resolver(disco_zone("TestAnswerANY"), "TestAnswerANY/");

    let answer = resolver
        .resolve(&name("multi.disco.net."), RecordType::ANY)
        .await
        .unwrap();

    assert!(answer.authority().is_empty());
    assert_eq!(
        types(answer.answers()),
        vec![RecordType::A, RecordType::A, RecordType::TXT]
    );
    assert_eq!(data(answer.answers())[..2].to_vec(), vec!["1.1.1.1", "1.1.1.2"]);
}

#[tokio::test]
async fn any_ignores_child_names() {
    subscribe();
    let resolver = resolver(disco_zone(""), "");

    let answer = resolver
        .resolve(&name("disco.net."), RecordType::ANY)
        .await
        .unwrap();

    // Only the apex SOA is directly under the name; `bar`, `multi` etc. are children.
    assert_eq!(types(answer.answers()), vec![RecordType::SOA]);
}

#[tokio::test]
async fn nested_arrays_are_flattened() {
    subscribe();
    let store: MemoryStore = [
        ("TestNested/net/disco/.A/0", "1.1.1.1"),
        ("TestNested/net/disco/.A/1", "1.1.1.2"),
        ("TestNested/net/disco/.A/2/0", "1.1.1.3"),
    ]
    .into_iter()
    .collect();
    let resolver = resolver(store, "TestNested/");

    let answer = resolver
        .resolve(&name("disco.net."), RecordType::A)
        .await
        .unwrap();

    assert_eq!(
        data(answer.answers()),
        vec!["1.1.1.1", "1.1.1.2", "1.1.1.3"]
    );
}

#[tokio::test]
async fn wildcard_answers_for_child_label() {
    subscribe();
    let resolver = resolver(disco_zone("TestWildcard"), "TestWildcard/");

    let answer = resolver
        .resolve(&name("baz.wild.disco.net."), RecordType::AAAA)
        .await
        .unwrap();

    assert!(answer.authority().is_empty());
    let [record] = answer.answers() else {
        panic!("expected one answer, got {:?}", answer.answers());
    };
    assert_eq!(record.name(), &name("baz.wild.disco.net."));
    assert_eq!(record.data(), &RData::AAAA(AAAA(Ipv6Addr::LOCALHOST)));
}

#[tokio::test]
async fn wildcard_does_not_answer_its_parent() {
    subscribe();
    let resolver = resolver(disco_zone("TestWildcardParent"), "TestWildcardParent/");

    let answer = resolver
        .resolve(&name("wild.disco.net."), RecordType::AAAA)
        .await
        .unwrap();

    assert!(answer.answers().is_empty());
    assert_eq!(types(answer.authority()), vec![RecordType::SOA]);
}

#[tokio::test]
async fn wildcard_is_single_level() {
    subscribe();
    let resolver = resolver(disco_zone(""), "");

    let answer = resolver
        .resolve(&name("deep.baz.wild.disco.net."), RecordType::AAAA)
        .await
        .unwrap();

    assert!(answer.answers().is_empty());
}

#[tokio::test]
async fn exact_match_wins_over_wildcard() {
    subscribe();
    let store = disco_zone("");
    store.set("/net/disco/wild/exact/.AAAA", "::2");
    let resolver = resolver(store, "");

    let answer = resolver
        .resolve(&name("exact.wild.disco.net."), RecordType::AAAA)
        .await
        .unwrap();

    assert_eq!(data(answer.answers()), vec!["::2"]);
}

#[tokio::test]
async fn prefixes_isolate_namespaces() {
    subscribe();
    let store = Arc::new(MemoryStore::new());
    store.set("TestOne/net/disco/bar/.A", "10.0.0.1");
    store.set("TestTwo/net/disco/bar/.A", "10.0.0.2");

    let one = Resolver::new(store.clone(), ResolverConfig::new().with_prefix("TestOne/"));
    let two = Resolver::new(store.clone(), ResolverConfig::new().with_prefix("TestTwo"));
    let three = Resolver::new(store, ResolverConfig::new().with_prefix("TestThree/"));

    let bar = name("bar.disco.net.");
    assert_eq!(
        data(one.resolve(&bar, RecordType::A).await.unwrap().answers()),
        vec!["10.0.0.1"]
    );
    assert_eq!(
        data(two.resolve(&bar, RecordType::A).await.unwrap().answers()),
        vec!["10.0.0.2"]
    );
    assert!(three.resolve(&bar, RecordType::A).await.unwrap().is_empty());
}

#[tokio::test]
async fn question_case_is_echoed() {
    subscribe();
    let resolver = resolver(disco_zone(""), "");

    let answer = resolver
        .resolve(&name("BAR.Disco.NET."), RecordType::A)
        .await
        .unwrap();

    let [record] = answer.answers() else {
        panic!("expected one answer, got {:?}", answer.answers());
    };
    assert_eq!(record.name().to_string(), "BAR.Disco.NET.");
}

#[tokio::test]
async fn labels_are_keyed_by_raw_bytes() {
    subscribe();
    let store = disco_zone("");
    store.set("/net/disco/a b/.A", "10.0.0.7");
    let resolver = resolver(store, "");

    // Presentation form escapes the space as `a\ b`; the key must not.
    let question = Name::from_labels(vec![
        b"A b".as_slice(),
        b"disco".as_slice(),
        b"net".as_slice(),
    ])
    .unwrap();

    let answer = resolver.resolve(&question, RecordType::A).await.unwrap();
    assert_eq!(data(answer.answers()), ["10.0.0.7"]);
    assert_eq!(answer.answers()[0].name(), &question);
    assert!(resolver.name_exists(&question).await.unwrap());

    let missing = Name::from_labels(vec![
        b"a c".as_slice(),
        b"disco".as_slice(),
        b"net".as_slice(),
    ])
    .unwrap();
    let answer = resolver.resolve(&missing, RecordType::A).await.unwrap();
    assert!(answer.answers().is_empty());
    assert_eq!(types(answer.authority()), [RecordType::SOA]);
}

#[tokio::test]
async fn lookup_query() {
    subscribe();
    let resolver = resolver(disco_zone(""), "");

    let query = Query::query(name("alias.disco.net."), RecordType::CNAME);
    let answer = resolver.lookup(&query).await.unwrap();

    assert_eq!(data(answer.answers()), vec!["bar.disco.net."]);
}

#[tokio::test]
async fn malformed_values_are_skipped() {
    subscribe();
    let store = disco_zone("");
    store.set("/net/disco/broken/.A/0", "not-an-address");
    store.set("/net/disco/broken/.A/1", "5.6.7.8");
    let resolver = resolver(store, "");

    let answer = resolver
        .resolve(&name("broken.disco.net."), RecordType::A)
        .await
        .unwrap();

    assert_eq!(data(answer.answers()), vec!["5.6.7.8"]);
    assert!(answer.authority().is_empty());
}

#[tokio::test]
async fn only_malformed_values_fall_back_to_authority() {
    subscribe();
    let store = disco_zone("");
    store.set("/net/disco/broken/.A", "999.1.1.1");
    let resolver = resolver(store, "");

    let answer = resolver
        .resolve(&name("broken.disco.net."), RecordType::A)
        .await
        .unwrap();

    assert!(answer.answers().is_empty());
    assert_eq!(types(answer.authority()), vec![RecordType::SOA]);
}

#[tokio::test]
async fn malformed_closest_soa_stops_the_walk() {
    subscribe();
    let store = disco_zone("");
    store.set("/net/disco/sub/.SOA", "not an soa");
    let resolver = resolver(store, "");

    let answer = resolver
        .resolve(&name("host.sub.disco.net."), RecordType::A)
        .await
        .unwrap();

    assert!(answer.is_empty());
}

#[tokio::test]
async fn unsupported_type_falls_back_to_authority() {
    subscribe();
    let resolver = resolver(disco_zone(""), "");

    let answer = resolver
        .resolve(&name("bar.disco.net."), RecordType::HINFO)
        .await
        .unwrap();

    assert!(answer.answers().is_empty());
    assert_eq!(types(answer.authority()), vec![RecordType::SOA]);
}

#[tokio::test]
async fn no_zone() {
    subscribe();
    let resolver = resolver(disco_zone(""), "");

    let answer = resolver
        .resolve(&name("www.example.org."), RecordType::A)
        .await
        .unwrap();

    assert!(answer.is_empty());
}

#[tokio::test]
async fn ttl_comes_from_config() {
    subscribe();
    let resolver = Resolver::new(disco_zone(""), ResolverConfig::new().with_ttl(60u32));

    let answer = resolver
        .resolve(&name("bar.disco.net."), RecordType::A)
        .await
        .unwrap();

    assert_eq!(answer.answers()[0].ttl(), 60);
}

#[tokio::test]
async fn resolve_str_accepts_relative_names() {
    subscribe();
    let resolver = resolver(disco_zone(""), "");

    let answer = resolver
        .resolve_str("bar.disco.net", RecordType::A)
        .await
        .unwrap();

    assert_eq!(answer.answers()[0].name(), &name("bar.disco.net."));
}

#[tokio::test]
async fn empty_name_is_invalid() {
    subscribe();
    let resolver = resolver(disco_zone(""), "");

    let error = resolver
        .resolve_str("", RecordType::A)
        .await
        .unwrap_err();

    assert!(matches!(error, ResolveError::InvalidName { .. }));
}

#[tokio::test]
async fn invalid_name_does_not_touch_the_store() {
    subscribe();
    let store = Arc::new(FailingStore::default());
    let resolver = Resolver::new(store.clone(), ResolverConfig::new());

    let question = Name::from_labels(vec![b"a/b".as_slice(), b"net".as_slice()])
        .unwrap();
    let error = resolver
        .resolve(&question, RecordType::A)
        .await
        .unwrap_err();

    assert!(matches!(error, ResolveError::InvalidName { .. }));
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn backend_fault_is_an_error() {
    subscribe();
    let resolver = Resolver::new(FailingStore::default(), ResolverConfig::new());

    let error = resolver
        .resolve(&name("bar.disco.net."), RecordType::A)
        .await
        .unwrap_err();

    assert!(matches!(error, ResolveError::Backend(_)));
}

#[tokio::test]
async fn name_exists() {
    subscribe();
    let resolver = resolver(disco_zone(""), "");

    assert!(resolver.name_exists(&name("bar.disco.net.")).await.unwrap());
    assert!(resolver.name_exists(&name("disco.net.")).await.unwrap());
    assert!(resolver.name_exists(&name("any.wild.disco.net.")).await.unwrap());
    assert!(!resolver.name_exists(&name("nope.disco.net.")).await.unwrap());
}
