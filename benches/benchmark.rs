use category_dictionary::{
    AnyStore, BackendKind, BayesOptions, BayesScorer, DictionaryBuilder, DictionaryModel,
    SquaredProbabilityScorer,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

const CATEGORIES: [&str; 4] = ["sport", "politics", "science", "culture"];

/// Character 4-grams of a pseudo random word stream
fn synthetic_documents(count: usize) -> Vec<(Vec<String>, &'static str)> {
    let mut state = 0x2545_f491_u32;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        state
    };
    (0..count)
        .map(|i| {
            let category = CATEGORIES[i % CATEGORIES.len()];
            let text: String = (0..160)
                .map(|_| {
                    // every category leans towards its own letters
                    let offset = (i % CATEGORIES.len()) as u32 * 4;
                    let letter = (next() % 10 + offset) % 26;
                    char::from(b'a' + letter as u8)
                })
                .collect();
            let chars: Vec<char> = text.chars().collect();
            let terms = chars.windows(4).map(|w| w.iter().collect()).collect();
            (terms, category)
        })
        .collect()
}

fn build(kind: BackendKind, documents: &[(Vec<String>, &str)]) -> DictionaryModel<AnyStore> {
    let mut builder = DictionaryBuilder::new(AnyStore::new(kind));
    for (terms, category) in documents {
        builder.add_document(terms, category).unwrap();
    }
    builder.build().unwrap()
}

fn build_and_classify_benchmark(c: &mut Criterion) {
    let documents = synthetic_documents(400);
    let kinds = [
        BackendKind::DirectMap,
        BackendKind::Trie,
        BackendKind::CategoryTrie,
        BackendKind::Hashed,
    ];

    let mut group = c.benchmark_group("build");
    for kind in kinds {
        group.bench_with_input(BenchmarkId::from_parameter(kind), &documents, |b, docs| {
            b.iter(|| build(kind, black_box(docs)));
        });
    }
    group.finish();

    let queries: Vec<Vec<String>> = synthetic_documents(64)
        .into_iter()
        .map(|(terms, _)| terms)
        .collect();
    let bayes = BayesScorer::new(BayesOptions::default());

    let mut group = c.benchmark_group("classify");
    for kind in kinds {
        let model = build(kind, &documents);
        group.bench_function(BenchmarkId::new("bayes", kind), |b| {
            b.iter(|| {
                for query in &queries {
                    black_box(model.classify(query, &bayes));
                }
            });
        });
        group.bench_function(BenchmarkId::new("squared_probability", kind), |b| {
            b.iter(|| {
                for query in &queries {
                    black_box(model.classify(query, &SquaredProbabilityScorer));
                }
            });
        });
    }
    group.finish();

    let model = build(BackendKind::Trie, &documents);
    c.bench_function("classify_batch", |b| {
        b.iter(|| model.classify_batch(black_box(&queries), &bayes));
    });
}

criterion_group!(benches, build_and_classify_benchmark);
criterion_main!(benches);
