use melted_scenario::engine::{
    AbortReason, ActionOutcome, RetryPolicy, RunState, Scenario, ScenarioError, ScenarioRunner, ScriptedIo,
    StepStatus, Termination, retry,
};
use melted_scenario::error::StepError;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

#[tokio::test]
async fn test_retry_exhausts_all_attempts() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();

    let result: Result<(), String> = retry(&RetryPolicy::from_millis(1, 3), || {
        let attempt = counter.fetch_add(1, Ordering::SeqCst) + 1;
        async move { Err(format!("attempt {attempt} failed")) }
    })
    .await;

    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_eq!(result.unwrap_err(), "attempt 4 failed");
}

#[tokio::test]
async fn test_retry_returns_first_success() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();

    let result = retry(&RetryPolicy::from_millis(1, 3), || {
        let attempt = counter.fetch_add(1, Ordering::SeqCst) + 1;
        async move {
            if attempt == 1 {
                Err("not yet".to_string())
            } else {
                Ok("ready")
            }
        }
    })
    .await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(result.unwrap(), "ready");
}

#[tokio::test]
async fn test_context_flows_between_steps() {
    let scenario = Scenario::builder("context")
        .action_fn("write", |ctx| {
            ctx.insert("x", 5);
            Ok(ActionOutcome::Continue)
        })
        .output_fn("read", |ctx| {
            let x: i64 = ctx.get_as("x")?;
            Ok(Some(format!("Value is {x}")))
        })
        .action_fn("check", |ctx| {
            let x: i64 = ctx.get_as("x")?;
            if x != 5 {
                return Err(StepError::Failed(format!("x は 5 のはずです: {x}")));
            }
            Ok(ActionOutcome::Continue)
        })
        .build();
    let mut runner = ScenarioRunner::new(ScriptedIo::default());

    let report = runner.run(&scenario).await.expect("scenario should complete");

    assert!(report.is_completed());
    assert_eq!(runner.state(), &RunState::Completed);
    assert_eq!(runner.io().output_texts(), vec!["Value is 5"]);
    assert_eq!(report.executed_step_names(), vec!["write", "read", "check"]);
    assert!(report.steps.iter().all(|s| s.status == StepStatus::Completed));
}

#[tokio::test]
async fn test_abort_stops_before_next_step() {
    let after_abort = Arc::new(AtomicU32::new(0));
    let counter = after_abort.clone();

    let scenario = Scenario::builder("abort")
        .output("before", "starting")
        .action_fn("stop", |_| Ok(ActionOutcome::abort("no capacity")))
        .output("after", "never shown")
        .action_fn("never", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(ActionOutcome::Continue)
        })
        .build();
    let mut runner = ScenarioRunner::new(ScriptedIo::default());

    let report = runner.run(&scenario).await.expect("abort is not an error");

    assert!(!report.is_completed());
    assert_eq!(
        report.abort_reason(),
        Some(&AbortReason::Requested {
            message: "no capacity".to_string()
        })
    );
    assert!(matches!(
        runner.state(),
        RunState::Terminated(Termination::Aborted { .. })
    ));
    assert_eq!(after_abort.load(Ordering::SeqCst), 0);
    assert_eq!(runner.io().output_texts(), vec!["starting"]);
    assert_eq!(report.executed_step_names(), vec!["before", "stop"]);
    assert_eq!(report.steps[1].status, StepStatus::Aborted);
}

#[tokio::test]
async fn test_declined_confirmation_aborts() {
    let scenario = Scenario::builder("gate")
        .confirm("confirmDeployment", "Continue?")
        .action_fn("handleConfirmDeployment", |ctx| match ctx.get_bool("confirmDeployment") {
            Some(false) => Ok(ActionOutcome::declined("confirmDeployment")),
            _ => Ok(ActionOutcome::Continue),
        })
        .output("deploying", "Deploying...")
        .build();
    let mut runner = ScenarioRunner::new(ScriptedIo::new(["n"]));

    let report = runner.run(&scenario).await.unwrap();

    assert_eq!(
        report.abort_reason(),
        Some(&AbortReason::UserDeclined {
            gate: "confirmDeployment".to_string()
        })
    );
    assert!(runner.io().output_texts().is_empty());
}

#[tokio::test]
async fn test_failed_step_terminates_with_error() {
    let scenario = Scenario::builder("failure")
        .action_fn("explode", |_| Err(StepError::Failed("boom".to_string())))
        .output("after", "never shown")
        .build();
    let mut runner = ScenarioRunner::new(ScriptedIo::default());

    let err = runner.run(&scenario).await.unwrap_err();

    assert!(matches!(
        err,
        ScenarioError::StepFailed { ref step, index: 0, .. } if step == "explode"
    ));
    assert!(matches!(
        runner.state(),
        RunState::Terminated(Termination::Failed { index: 0, .. })
    ));
    assert!(runner.io().output_texts().is_empty());
}

#[tokio::test]
async fn test_report_serializes_final_state() {
    let scenario = Scenario::builder("json")
        .action_fn("write", |ctx| {
            ctx.insert("loadBalancerDns", "lb.example.test");
            Ok(ActionOutcome::Continue)
        })
        .build();
    let mut runner = ScenarioRunner::new(ScriptedIo::default());

    let report = runner.run(&scenario).await.unwrap();
    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

    assert_eq!(json["scenario_name"], "json");
    assert_eq!(json["state"]["state"], "completed");
    assert_eq!(json["context"]["loadBalancerDns"], "lb.example.test");
}
