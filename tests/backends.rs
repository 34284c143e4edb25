use category_dictionary::{
    AnyStore, BackendKind, BayesOptions, BayesScorer, DictionaryBuilder, DictionaryError,
    DictionaryModel, DirectStore, SquaredProbabilityScorer, TermStore,
};
use proptest::prelude::*;

const ENUMERABLE: [BackendKind; 3] = [
    BackendKind::DirectMap,
    BackendKind::Trie,
    BackendKind::CategoryTrie,
];

const ALL: [BackendKind; 4] = [
    BackendKind::DirectMap,
    BackendKind::Trie,
    BackendKind::CategoryTrie,
    BackendKind::Hashed,
];

fn corpus() -> Vec<(Vec<&'static str>, &'static str, u64)> {
    vec![
        (vec!["cheap", "pills", "buy", "now", "cheap"], "spam", 1),
        (vec!["meeting", "at", "noon", "buy", "lunch"], "ham", 1),
        (vec!["cheap", "flights", "now"], "spam", 2),
        (vec!["the", "quarterly", "meeting", "notes"], "ham", 1),
        (vec!["then", "the", "theme"], "ham", 1),
        (vec!["win", "now", "the", "prize"], "spam", 1),
    ]
}

fn train(kind: BackendKind) -> DictionaryModel<AnyStore> {
    let mut builder = DictionaryBuilder::new(AnyStore::new(kind));
    for (terms, category, weight) in corpus() {
        builder.add_weighted_document(terms, category, weight).unwrap();
    }
    builder.build().unwrap()
}

#[test]
fn enumerable_backends_agree_on_every_term() {
    let reference = train(BackendKind::DirectMap);
    let terms: Vec<String> = reference
        .entries()
        .unwrap()
        .map(|(term, _)| term.into_owned())
        .collect();
    assert_eq!(terms.len(), reference.num_terms());

    for kind in ENUMERABLE {
        let model = train(kind);
        assert_eq!(model.num_terms(), reference.num_terms(), "{kind}");
        assert_eq!(model.document_counts(), reference.document_counts(), "{kind}");
        assert_eq!(model.term_counts(), reference.term_counts(), "{kind}");
        for term in &terms {
            assert_eq!(
                model.category_entries(term),
                reference.category_entries(term),
                "{kind}: {term}"
            );
        }
        assert!(model.same_content(&reference), "{kind}");
        assert!(reference.same_content(&model), "{kind}");
    }
}

#[test]
fn hashed_backend_matches_on_scores_only() {
    let reference = train(BackendKind::DirectMap);
    let hashed = train(BackendKind::Hashed);

    assert!(!hashed.store().is_enumerable());
    assert!(matches!(
        hashed.entries(),
        Err(DictionaryError::UnsupportedOperation(_))
    ));
    assert_eq!(hashed.num_terms(), reference.num_terms());
    assert_eq!(hashed.term_counts(), reference.term_counts());
    assert_eq!(hashed.category_entries("cheap"), reference.category_entries("cheap"));
    assert!(hashed.same_content(&reference));

    let document = ["cheap", "meeting", "now", "unknown"];
    let bayes = BayesScorer::new(BayesOptions::default());
    for (expected, actual) in [
        (
            reference.classify(document, &SquaredProbabilityScorer),
            hashed.classify(document, &SquaredProbabilityScorer),
        ),
        (reference.classify(document, &bayes), hashed.classify(document, &bayes)),
    ] {
        assert_eq!(expected.len(), actual.len());
        for (category, score) in expected.iter() {
            assert_eq!(actual.get(category), Some(score), "{category}");
        }
        assert_eq!(expected.most_likely(), actual.most_likely());
    }
}

#[test]
fn merging_is_only_possible_from_enumerable_models() {
    let hashed = train(BackendKind::Hashed);
    let mut builder = DictionaryBuilder::new(DirectStore::new());
    assert!(matches!(
        builder.add_dictionary(&hashed),
        Err(DictionaryError::UnsupportedOperation(_))
    ));

    // a sharded build merged at the end equals a single build
    let documents = corpus();
    let (left, right) = documents.split_at(3);
    let mut shards = Vec::new();
    for part in [left, right] {
        let mut shard = DictionaryBuilder::new(AnyStore::new(BackendKind::Trie));
        for (terms, category, weight) in part {
            shard.add_weighted_document(terms, category, *weight).unwrap();
        }
        shards.push(shard.build().unwrap());
    }
    for shard in &shards {
        builder.add_dictionary(shard).unwrap();
    }
    let merged = builder.build().unwrap();
    assert!(merged.same_content(&train(BackendKind::DirectMap)));
}

fn stream() -> impl Strategy<Value = Vec<(Vec<String>, String, u64)>> {
    let terms = prop::collection::vec("[a-c]{1,3}", 0..6);
    let category = prop::sample::select(vec!["X", "Y", "Z"]).prop_map(str::to_string);
    prop::collection::vec((terms, category, 1u64..4), 1..24)
}

proptest! {
    #[test]
    fn totals_equal_applied_increments(documents in stream()) {
        let mut builder = DictionaryBuilder::new(DirectStore::new());
        let mut expected: std::collections::HashMap<(String, String), u64> = Default::default();
        for (terms, category, weight) in &documents {
            builder.add_weighted_document(terms, category, *weight).unwrap();
            for term in terms {
                *expected.entry((term.clone(), category.clone())).or_default() += weight;
            }
        }
        let model = builder.build().unwrap();

        for ((term, category), count) in &expected {
            prop_assert_eq!(model.count(term, category), *count);
        }
        for (term, entries) in model.iter() {
            let applied: u64 = expected
                .iter()
                .filter(|((t, _), _)| t.as_str() == &*term)
                .map(|(_, count)| *count)
                .sum();
            prop_assert_eq!(entries.total(), applied);
        }
        let weights: u64 = documents.iter().map(|(_, _, weight)| *weight).sum();
        prop_assert_eq!(model.num_documents(), weights);
    }

    #[test]
    fn backends_agree_on_random_streams(documents in stream()) {
        let models: Vec<_> = ALL
            .iter()
            .map(|&kind| {
                let mut builder = DictionaryBuilder::new(AnyStore::new(kind));
                for (terms, category, weight) in &documents {
                    builder.add_weighted_document(terms, category, *weight).unwrap();
                }
                builder.build().unwrap()
            })
            .collect();
        let reference = &models[0];
        for model in &models[1..] {
            prop_assert_eq!(model.num_terms(), reference.num_terms());
            prop_assert_eq!(model.term_counts(), reference.term_counts());
            for (term, entries) in reference.entries().unwrap() {
                prop_assert_eq!(&*model.category_entries(&term), &*entries);
            }
        }
    }
}
