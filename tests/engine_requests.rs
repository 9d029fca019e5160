mod util;

use std::collections::HashMap;
use std::sync::Arc;

use cluster_nav::prelude::*;
use util::*;

fn engine() -> NavigationEngine<CsrAdjacency> {
    NavigationEngine::new(
        Arc::new(six_account_artifact()),
        Arc::new(pair_graph()),
        metadata(6),
        Arc::new(ClusterLabelStore::in_memory()),
        NavigatorConfig::default(),
    )
    .unwrap()
}

fn large_engine(n: usize) -> NavigationEngine<CsrAdjacency> {
    NavigationEngine::new(
        Arc::new(random_artifact(n, 4, 11)),
        Arc::new(random_graph(n, 4, 12)),
        Vec::new(),
        Arc::new(ClusterLabelStore::in_memory()),
        NavigatorConfig::default(),
    )
    .unwrap()
}

fn ids(view: &HierarchicalViewData) -> Vec<&str> {
    view.clusters.iter().map(|c| c.id.as_str()).collect()
}

#[test]
fn state_round_trips_through_json() {
    let mut state = ViewState {
        granularity: Some(3),
        ego: Some("acct0".into()),
        ..ViewState::default()
    };
    state.edits.push(ViewEdit::Expand("d_9".into()));
    state.edits.push(ViewEdit::Reveal("acct0".into()));
    let json = serde_json::to_string(&state).unwrap();
    let back: ViewState = serde_json::from_str(&json).unwrap();
    assert_eq!(back, state);

    assert!(json.contains(r#"{"op":"expand","id":"d_9"}"#));

    // every field is optional on the wire
    let minimal: ViewState = serde_json::from_str("{}").unwrap();
    assert_eq!(minimal, ViewState::default());
}

#[test]
fn views_are_partitions_and_cached() {
    let e = engine();
    let state = ViewState {
        granularity: Some(3),
        budget: 10,
        ..ViewState::default()
    };
    let view = e.navigate(&state, None).unwrap();
    assert_eq!(ids(&view), vec!["d_6", "d_7", "d_8"]);
    assert_eq!(view.budget, 10);
    assert_eq!(view.budget_remaining, 7);
    let mut leaves: Vec<usize> = view.clusters.iter().flat_map(|c| c.member_leaves.clone()).collect();
    leaves.sort_unstable();
    assert_eq!(leaves, (0..6).collect::<Vec<_>>());

    let again = e.navigate(&state, None).unwrap();
    assert!(Arc::ptr_eq(&view, &again));
    e.invalidate_all();
    let rebuilt = e.navigate(&state, None).unwrap();
    assert!(!Arc::ptr_eq(&view, &rebuilt));
    assert_eq!(ids(&rebuilt), ids(&view));
}

#[test]
fn expand_reports_budget_exhaustion() {
    let e = engine();
    let state = ViewState {
        granularity: Some(4),
        budget: 5,
        ..ViewState::default()
    };
    let base = e.navigate(&state, None).unwrap();
    assert_eq!(ids(&base), vec!["d_4", "d_5", "d_6", "d_7"]);
    assert!(base.cluster("d_4").unwrap().is_individual);

    let (next, view) = e.expand(&state, "d_6", None).unwrap();
    assert_eq!(view.total_clusters, 5);
    assert_eq!(view.budget_remaining, 0);
    assert!(view.cluster("d_0").is_some() && view.cluster("d_1").is_some());

    // the set is full now, so any further growth fails
    let target = view.clusters.iter().find(|c| c.size >= 2).unwrap().id.clone();
    let err = e.expand(&next, &target, None).unwrap_err();
    assert_eq!(err.reason(), "budget_exhausted");
}

#[test]
fn reveal_survives_a_later_expand() {
    let e = NavigationEngine::new(
        Arc::new(balanced_eight_artifact()),
        Arc::new(CsrAdjacency::from_edges(8, &[(4, 5), (6, 7)]).unwrap()),
        Vec::new(),
        Arc::new(ClusterLabelStore::in_memory()),
        NavigatorConfig::default(),
    )
    .unwrap();
    let state = ViewState {
        granularity: Some(2),
        budget: 5,
        ..ViewState::default()
    };
    let revealed = e.reveal_leaf(&state, "acct4", 5, None).unwrap();
    assert!(revealed.outcome.ok);
    assert_eq!(ids(&revealed.view.unwrap()), vec!["d_4", "d_5", "d_11", "d_12"]);

    // one slot left: d_12 splits into one individual plus a residual group
    let (next, view) = e.expand(&revealed.state, "d_12", None).unwrap();
    assert!(view.cluster("d_4").is_some());
    assert_eq!(view.total_clusters, 5);
    assert_eq!(view.budget_remaining, 0);
    assert_eq!(next.revealed().collect::<Vec<_>>(), vec!["acct4"]);
    assert!(Arc::ptr_eq(&e.navigate(&next, None).unwrap(), &view));

    // the group id from the view is live in the replayed set
    let rest = view
        .clusters
        .iter()
        .find(|c| c.parent_id.as_deref() == Some("d_12") && c.size > 1)
        .unwrap();
    assert_eq!(rest.size, 3);
    let err = e.expand(&next, &rest.id, None).unwrap_err();
    assert_eq!(err.reason(), "budget_exhausted");
}

#[test]
fn reveal_by_account_or_leaf_index() {
    let e = engine();
    let state = ViewState {
        granularity: Some(3),
        budget: 5,
        ..ViewState::default()
    };
    let by_id = e.reveal_leaf(&state, "acct3", 5, None).unwrap();
    assert!(by_id.outcome.ok);
    let by_index = e.reveal_leaf(&state, "3", 5, None).unwrap();
    assert_eq!(by_index.state, by_id.state);
    assert!(by_id.view.unwrap().cluster("d_3").unwrap().is_individual);

    let bad_budget = e.reveal_leaf(&state, "acct3", 2, None).unwrap_err();
    assert_eq!(bad_budget.reason(), "validation");
}

#[test]
fn positions_stay_close_across_edits() {
    let e = large_engine(200);
    let state = ViewState {
        budget: 40,
        ..ViewState::default()
    };
    let base = e.navigate(&state, None).unwrap();
    assert_eq!(base.total_clusters, compute_base_cut(40));
    let biggest = base.clusters.iter().max_by_key(|c| (c.size, std::cmp::Reverse(c.id.clone()))).unwrap();
    let (_, next) = e.expand(&state, &biggest.id, Some(&base.positions)).unwrap();
    let stats = next.alignment.as_ref().unwrap();
    assert!(stats.overlap >= 2);
    assert!(stats.rms_after <= stats.rms_before);
    assert!(next.total_clusters <= 40);
}

#[test]
fn louvain_partition_changes_edge_weights() {
    let e = engine();
    let state = ViewState {
        granularity: Some(3),
        budget: 10,
        louvain_weight: 0.5,
        ..ViewState::default()
    };
    let plain = e.navigate(&state, None).unwrap();
    let edge = plain.edges.iter().find(|x| x.source == "d_6" && x.target == "d_7").unwrap();
    assert!((edge.weight - 1.0).abs() < 1e-12);

    let partition: LouvainPartition = HashMap::from([("acct1".to_string(), 0), ("acct2".to_string(), 0)]);
    e.set_louvain_partition(Some(&partition));
    let fused = e.navigate(&state, None).unwrap();
    let edge = fused.edges.iter().find(|x| x.source == "d_6" && x.target == "d_7").unwrap();
    assert!((edge.weight - 1.5).abs() < 1e-12);
    assert_eq!(edge.raw_count, 1);
}

#[test]
fn tag_summary_goes_through_the_store() {
    let store = Arc::new(ClusterLabelStore::in_memory());
    store.add_tag("me", "acct4", "press", Polarity::In).unwrap();
    store.add_tag("me", "acct5", "press", Polarity::In).unwrap();
    let e = NavigationEngine::new(
        Arc::new(six_account_artifact()),
        Arc::new(pair_graph()),
        metadata(6),
        Arc::clone(&store),
        NavigatorConfig::default(),
    )
    .unwrap();
    let summary = e.tag_summary("d_8", "me", &["acct4", "acct5"]);
    assert_eq!(summary.suggested_label.as_deref(), Some("press"));

    let state = ViewState {
        granularity: Some(3),
        budget: 10,
        ego: Some("me".into()),
        ..ViewState::default()
    };
    let view = e.navigate(&state, None).unwrap();
    let d8 = view.cluster("d_8").unwrap();
    assert_eq!((d8.label.as_str(), d8.label_source), ("press", LabelSource::Tag));
}
