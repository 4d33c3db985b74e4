use docrag_core::{Error, Passage};
use docrag_vector::VectorIndex;

fn invoice_index() -> VectorIndex {
    VectorIndex::build(
        3,
        vec![
            Passage::new(0, "Invoice total is $500."),
            Passage::new(1, "Payment due in 30 days."),
            Passage::new(2, "Customer ID: C1042."),
        ],
        vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0], vec![0.0, 0.0, 1.0]],
    )
    .expect("build")
}

#[test]
fn nearest_passage_for_invoice_query() {
    let index = invoice_index();
    let hits = index.search(&[0.9, 0.1, 0.0], 1).expect("search");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].passage.text, "Invoice total is $500.");
    assert!((hits[0].distance - 0.02).abs() < 1e-6);
}

#[test]
fn top_k_larger_than_corpus_returns_all_ascending() {
    let index = invoice_index();
    let hits = index.search(&[0.9, 0.1, 0.0], 5).expect("search");
    let ids: Vec<u64> = hits.iter().map(|h| h.passage.id).collect();
    assert_eq!(ids, vec![0, 1, 2]);
    assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
}

#[test]
fn every_passage_retrieves_itself_first() {
    let index = invoice_index();
    for id in 0..3u64 {
        let v = index.vector(id).expect("vector").to_vec();
        let hits = index.search(&v, 1).expect("search");
        assert_eq!(hits[0].passage.id, id);
        assert_eq!(hits[0].distance, 0.0);
    }
}

#[test]
fn equal_distances_are_ordered_by_id() {
    let index = VectorIndex::build(
        2,
        vec![Passage::new(0, "a"), Passage::new(1, "b"), Passage::new(2, "c")],
        vec![vec![1.0, 0.0], vec![-1.0, 0.0], vec![0.0, 1.0]],
    )
    .expect("build");
    let hits = index.search(&[0.0, 0.0], 2).expect("search");
    assert_eq!(hits.iter().map(|h| h.passage.id).collect::<Vec<_>>(), vec![0, 1]);
}

#[test]
fn empty_index_and_zero_top_k_return_nothing() {
    let empty = VectorIndex::new(3).expect("new");
    assert!(empty.search(&[1.0, 0.0, 0.0], 5).expect("search").is_empty());
    assert!(invoice_index().search(&[1.0, 0.0, 0.0], 0).expect("search").is_empty());
}

#[test]
fn query_with_wrong_dimension_is_rejected() {
    let err = invoice_index().search(&[1.0, 0.0], 1).unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { expected: 3, actual: 2 }));
}

#[test]
fn query_with_non_finite_component_is_rejected() {
    let index = invoice_index();
    for query in [[f32::NAN, 0.0, 0.0], [0.0, f32::INFINITY, 0.0]] {
        let err = index.search(&query, 2).unwrap_err();
        assert!(matches!(err, Error::InvalidQuery(_)), "{err:?}");
    }
}

#[test]
fn add_with_wrong_dimension_leaves_index_unchanged() {
    let mut index = invoice_index();
    let err = index.add(Passage::new(3, "extra"), &[1.0, 2.0]).unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { expected: 3, actual: 2 }));
    assert_eq!(index.len(), 3);
    assert!(index.passage(3).is_none());

    let err = index.add(Passage::new(3, "nan"), &[f32::NAN, 0.0, 0.0]).unwrap_err();
    assert!(matches!(err, Error::IndexBuild(_)));
    let err = index.add(Passage::new(7, "gap"), &[0.0, 0.0, 0.0]).unwrap_err();
    assert!(matches!(err, Error::IndexBuild(_)));
    assert_eq!(index.len(), 3);

    index.add(Passage::new(3, "fine"), &[0.5, 0.5, 0.0]).expect("add");
    assert_eq!(index.passage(3).map(|p| p.text.as_str()), Some("fine"));
}

#[test]
fn build_rejects_inconsistent_input() {
    let two_passages = vec![Passage::new(0, "a"), Passage::new(1, "b")];
    let err = VectorIndex::build(2, two_passages.clone(), vec![vec![0.0, 1.0]]).unwrap_err();
    assert!(matches!(err, Error::IndexBuild(_)));

    let err = VectorIndex::build(2, two_passages, vec![vec![0.0, 1.0], vec![1.0]]).unwrap_err();
    assert!(matches!(err, Error::IndexBuild(_)));

    assert!(matches!(VectorIndex::new(0), Err(Error::IndexBuild(_))));
}
