use std::io::Cursor;

use byteorder::{BigEndian, WriteBytesExt};
use category_dictionary::dictionary::codec::write_model_version;
use category_dictionary::{
    read_model, write_model, AnyStore, BackendKind, DictionaryBuilder, DictionaryError,
    DictionaryModel, FeatureSetting, PruningStrategy, DEFAULT_NAME, FORMAT_VERSION,
};

fn train(kind: BackendKind) -> DictionaryModel<AnyStore> {
    let mut builder = DictionaryBuilder::new(AnyStore::new(kind))
        .with_name("news")
        .with_features(FeatureSetting::char_ngrams(3, 5).unwrap().with_max_terms(200));
    builder.add_document(["goal", "match", "score"], "sport").unwrap();
    builder.add_document(["vote", "match", "poll"], "politics").unwrap();
    builder.add_weighted_document(["goal", "goal", "club"], "sport", 3).unwrap();
    builder.add_document(["élection", "vote"], "politics").unwrap();
    builder.build().unwrap()
}

fn roundtrip(model: &DictionaryModel<AnyStore>) -> DictionaryModel<AnyStore> {
    let mut bytes = Vec::new();
    write_model(model, &mut bytes).unwrap();
    read_model(Cursor::new(bytes)).unwrap()
}

#[test]
fn every_backend_survives_a_roundtrip() {
    for kind in [
        BackendKind::DirectMap,
        BackendKind::Trie,
        BackendKind::CategoryTrie,
        BackendKind::Hashed,
    ] {
        let model = train(kind);
        let restored = roundtrip(&model);

        assert_eq!(restored.backend(), kind);
        assert_eq!(restored.name(), "news");
        assert_eq!(restored.feature_setting(), model.feature_setting());
        assert_eq!(restored.document_counts(), model.document_counts());
        assert_eq!(restored.term_counts(), model.term_counts());
        assert_eq!(restored.category_entries("goal").get("sport"), 7);
        assert_eq!(restored.category_entries("élection").get("politics"), 1);
        assert!(restored.same_content(&model), "{kind}");
    }
}

#[test]
fn pruned_model_roundtrip() {
    let mut builder = DictionaryBuilder::new(AnyStore::new(BackendKind::Trie))
        .with_pruning(PruningStrategy::term_count(2));
    builder.add_document(["a", "b"], "X").unwrap();
    builder.add_document(["a", "c"], "Y").unwrap();
    let model = builder.build().unwrap();
    assert_eq!(model.num_terms(), 1);

    let restored = roundtrip(&model);
    assert_eq!(restored.name(), DEFAULT_NAME);
    assert_eq!(restored.document_counts().get("X"), 1);
    assert_eq!(restored.term_counts().get("X"), 1);
    assert!(restored.same_content(&model));
}

fn put_string(bytes: &mut Vec<u8>, value: &str) {
    bytes.write_u32::<BigEndian>(value.len() as u32).unwrap();
    bytes.extend_from_slice(value.as_bytes());
}

/// A version 1 stream as the historical writer produced it
fn version_one_stream() -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.write_i32::<BigEndian>(1).unwrap();

    bytes.write_i32::<BigEndian>(2).unwrap();
    put_string(&mut bytes, "X");
    bytes.write_i32::<BigEndian>(1).unwrap();
    put_string(&mut bytes, "Y");
    bytes.write_i32::<BigEndian>(1).unwrap();

    bytes.write_i32::<BigEndian>(3).unwrap();
    put_string(&mut bytes, "a");
    bytes.write_i32::<BigEndian>(2).unwrap();
    bytes.write_i32::<BigEndian>(0).unwrap();
    bytes.write_i32::<BigEndian>(1).unwrap();
    bytes.write_i32::<BigEndian>(1).unwrap();
    bytes.write_i32::<BigEndian>(1).unwrap();
    put_string(&mut bytes, "b");
    bytes.write_i32::<BigEndian>(1).unwrap();
    bytes.write_i32::<BigEndian>(0).unwrap();
    bytes.write_i32::<BigEndian>(1).unwrap();
    put_string(&mut bytes, "c");
    bytes.write_i32::<BigEndian>(1).unwrap();
    bytes.write_i32::<BigEndian>(1).unwrap();
    bytes.write_i32::<BigEndian>(1).unwrap();

    // no feature setting
    bytes.write_u8(0).unwrap();
    put_string(&mut bytes, "legacy");
    bytes
}

#[test]
fn reads_hand_built_version_one_stream() {
    let model = read_model(Cursor::new(version_one_stream())).unwrap();

    assert_eq!(model.backend(), BackendKind::Trie);
    assert_eq!(model.name(), "legacy");
    assert_eq!(model.feature_setting(), None);
    assert_eq!(model.num_terms(), 3);
    assert_eq!(model.category_entries("a").get("X"), 1);
    assert_eq!(model.category_entries("a").get("Y"), 1);
    assert_eq!(model.document_counts().get("X"), 1);
    // term totals are recomputed from the records
    assert_eq!(model.term_counts().get("X"), 2);
    assert_eq!(model.term_counts().get("Y"), 2);

    // and written back byte for byte
    let mut bytes = Vec::new();
    write_model_version(&model, &mut bytes, 1).unwrap();
    assert_eq!(bytes, version_one_stream());
}

#[test]
fn migrates_version_one_to_current() {
    let legacy = read_model(Cursor::new(version_one_stream())).unwrap();
    let mut bytes = Vec::new();
    write_model(&legacy, &mut bytes).unwrap();
    assert_eq!(&bytes[..4], &FORMAT_VERSION.to_be_bytes());

    let current = read_model(Cursor::new(bytes)).unwrap();
    assert!(current.same_content(&legacy));
    assert_eq!(current.name(), "legacy");
}

#[test]
fn unknown_versions_are_rejected() {
    for version in [0, 3, -1] {
        let mut bytes = version_one_stream();
        bytes[..4].copy_from_slice(&i32::to_be_bytes(version));
        match read_model(Cursor::new(bytes)) {
            Err(DictionaryError::FormatVersionMismatch { found, supported }) => {
                assert_eq!(found, version);
                assert!(supported.contains(&FORMAT_VERSION));
            }
            other => panic!("expected a version mismatch, got {other:?}"),
        }
    }
}

#[test]
fn corrupt_version_one_streams() {
    // category index of the single entry of "b" points outside the table
    let mut bytes = version_one_stream();
    bytes[64..68].copy_from_slice(&7i32.to_be_bytes());
    assert!(matches!(
        read_model(Cursor::new(bytes)),
        Err(DictionaryError::Corrupt(_))
    ));

    // negative document count
    let mut bytes = version_one_stream();
    bytes[13..17].copy_from_slice(&(-4i32).to_be_bytes());
    assert!(matches!(
        read_model(Cursor::new(bytes)),
        Err(DictionaryError::Corrupt(_))
    ));

    // cut short
    let bytes = version_one_stream();
    assert!(matches!(
        read_model(Cursor::new(&bytes[..bytes.len() - 3])),
        Err(DictionaryError::Io(_))
    ));
}

#[test]
fn hashed_models_need_the_current_version() {
    let model = train(BackendKind::Hashed);
    assert!(matches!(
        write_model_version(&model, Vec::new(), 1),
        Err(DictionaryError::UnsupportedOperation(_))
    ));
    assert!(matches!(
        write_model_version(&model, Vec::new(), 9),
        Err(DictionaryError::FormatVersionMismatch { found: 9, .. })
    ));
}

#[test]
fn save_and_load_through_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.dict");
    let model = train(BackendKind::CategoryTrie);

    model.save(&path).unwrap();
    // overwriting replaces the whole file
    model.save(&path).unwrap();
    let loaded = DictionaryModel::<AnyStore>::load(&path).unwrap();
    assert_eq!(loaded.backend(), BackendKind::CategoryTrie);
    assert!(loaded.same_content(&model));

    let leftovers: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(leftovers.len(), 1);

    assert!(matches!(
        DictionaryModel::<AnyStore>::load(dir.path().join("missing.dict")),
        Err(DictionaryError::Io(_))
    ));
}
