/// Tests for the declared submission chain and its topological validation

use super::*;

// ============================================================================
// Tests: Standard plan
// ============================================================================

#[test]
fn test_standard_plan_validates() {
    SubmissionPlan::standard().validate().unwrap();
}

#[test]
fn test_standard_plan_order() {
    let plan = SubmissionPlan::standard();
    let names: Vec<&str> = plan.nodes().iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, vec!["compute", "graphics", "post_process", "ui", "present"]);
}

#[test]
fn test_post_process_waits_on_acquire() {
    let plan = SubmissionPlan::standard();
    let post = &plan.nodes()[2];
    assert!(post.waits.contains(&semaphore::IMAGE_AVAILABLE.to_string()));
    assert!(post.waits.contains(&semaphore::FORWARD_RENDER_FINISHED.to_string()));
}

#[test]
fn test_present_waits_on_render_finished_only() {
    let plan = SubmissionPlan::standard();
    let present = plan.nodes().last().unwrap();
    assert_eq!(present.waits, vec![semaphore::RENDER_FINISHED.to_string()]);
    assert!(present.signals.is_empty());
}

// ============================================================================
// Tests: Validation failures
// ============================================================================

fn node(name: &str, waits: &[&str], signals: &[&str]) -> SubmitNode {
    SubmitNode {
        name: name.to_string(),
        waits: waits.iter().map(|s| s.to_string()).collect(),
        signals: signals.iter().map(|s| s.to_string()).collect(),
    }
}

fn plan(external: &[&str], nodes: Vec<SubmitNode>) -> SubmissionPlan {
    SubmissionPlan {
        external_signals: external.iter().map(|s| s.to_string()).collect(),
        nodes,
    }
}

#[test]
fn test_wait_on_unsignaled_semaphore_rejected() {
    let broken = plan(&[], vec![node("a", &["ghost"], &["done"]), node("b", &["done"], &[])]);
    assert!(matches!(broken.validate(), Err(Error::Configuration(_))));
}

#[test]
fn test_wait_on_later_signal_rejected() {
    // "a" waits on a semaphore only signaled by "b" after it: a cycle once
    // the chain wraps
    let broken = plan(
        &[],
        vec![node("a", &["late"], &["x"]), node("b", &["x"], &["late"])],
    );
    assert!(matches!(broken.validate(), Err(Error::Configuration(_))));
}

#[test]
fn test_double_signal_rejected() {
    let broken = plan(
        &[],
        vec![
            node("a", &[], &["s"]),
            node("b", &["s"], &["s"]),
        ],
    );
    assert!(matches!(broken.validate(), Err(Error::Configuration(_))));
}

#[test]
fn test_dangling_signal_rejected() {
    let broken = plan(
        &[],
        vec![node("a", &[], &["s", "orphan"]), node("b", &["s"], &[])],
    );
    assert!(matches!(broken.validate(), Err(Error::Configuration(_))));
}

#[test]
fn test_double_wait_rejected() {
    let broken = plan(
        &[],
        vec![
            node("a", &[], &["s"]),
            node("b", &["s"], &["t"]),
            node("c", &["s", "t"], &[]),
        ],
    );
    assert!(matches!(broken.validate(), Err(Error::Configuration(_))));
}

#[test]
fn test_unlinked_consecutive_nodes_rejected() {
    // "b" only waits on an external semaphore, so the chain is not linear
    let broken = plan(
        &["ext"],
        vec![node("a", &[], &["s"]), node("b", &["ext"], &[])],
    );
    assert!(matches!(broken.validate(), Err(Error::Configuration(_))));
}
