use std::sync::Arc;

use category_dictionary::{
    AnyStore, BayesOptions, BayesScorer, DictionaryBuilder, DictionaryModel, FeatureSetting,
    PruningStrategy, SquaredProbabilityScorer, SynchronizedModel, TrieStore,
};

/// lowercase word unigrams and bigrams
fn terms(text: &str) -> Vec<String> {
    let words: Vec<String> = text.split_whitespace().map(str::to_lowercase).collect();
    let bigrams = words.windows(2).map(|w| format!("{} {}", w[0], w[1]));
    words.iter().cloned().chain(bigrams).collect()
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    // train
    let mut builder = DictionaryBuilder::new(TrieStore::new())
        .with_name("mail")
        .with_features(FeatureSetting::word_ngrams(1, 2).unwrap())
        .with_pruning(PruningStrategy::term_count(2));
    let training = [
        ("Cheap pills buy now", "spam"),
        ("Buy cheap watches now", "spam"),
        ("You won a prize claim now", "spam"),
        ("Meeting moved to noon", "ham"),
        ("Notes from the meeting", "ham"),
        ("Lunch at noon tomorrow", "ham"),
    ];
    for (text, category) in training {
        builder.add_document(terms(text), category).unwrap();
    }
    let model = builder.build().unwrap();
    println!("{}", model);
    println!("cheap: {}", model.category_entries("cheap"));

    // classify
    let bayes = BayesScorer::new(BayesOptions::default());
    let scores = model.classify(terms("buy cheap now"), &bayes);
    println!("{:#?}", scores);
    let scores = model.classify(terms("meeting at noon"), &SquaredProbabilityScorer);
    println!("most likely: {:?}", scores.most_likely());

    // export
    print!("{}", model.to_csv().unwrap());

    // persist and share
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mail.dict");
    model.save(&path).unwrap();
    let loaded = DictionaryModel::<AnyStore>::load(&path).unwrap();
    println!("loaded {} (same content: {})", loaded, loaded.same_content(&model));

    let shared = Arc::new(SynchronizedModel::new(model));
    let worker = {
        let shared = Arc::clone(&shared);
        std::thread::spawn(move || shared.classify(terms("claim your prize"), &bayes))
    };
    println!("from thread: {}", worker.join().unwrap());
}
