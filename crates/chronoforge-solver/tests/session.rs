//! Tests for solver sessions against a scripted engine.

use std::sync::{Arc, Mutex};

use chronoforge_config::Parameters;
use chronoforge_core::wire::EngineRequest;
use chronoforge_core::{Model, Solution, WireError};
use chronoforge_solver::{CommandStatus, Solver, SolverError, SolverEvent, SolverState};
use chronoforge_test::{models, FakeEngine, Reply};
use tokio::io::AsyncReadExt;

fn solver(engine: &FakeEngine) -> Solver {
    Solver::with_launcher(Arc::new(engine.clone()))
}

fn two_task_engine() -> FakeEngine {
    FakeEngine::solving(|m| models::two_tasks_solution(m, 0).into_iter().collect())
}

fn kind(event: &SolverEvent) -> &'static str {
    match event {
        SolverEvent::Log(_) => "log",
        SolverEvent::Trace(_) => "trace",
        SolverEvent::Warning(_) => "warning",
        SolverEvent::Error(_) => "error",
        SolverEvent::Solution(_) => "solution",
        SolverEvent::LowerBound(_) => "lowerBound",
        SolverEvent::Summary(_) => "summary",
        SolverEvent::Close => "close",
    }
}

async fn drain(mut rx: tokio::sync::mpsc::UnboundedReceiver<SolverEvent>) -> Vec<SolverEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

fn counter() -> (Arc<Mutex<Vec<String>>>, Arc<Mutex<Vec<String>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    (Arc::clone(&seen), seen)
}

// ============================================================================
// Solving
// ============================================================================

#[tokio::test]
async fn test_two_task_scenario() {
    let tasks = models::two_tasks().unwrap();
    let engine = two_task_engine();
    let mut solver = solver(&engine);

    let result = solver
        .solve(&tasks.model, &Parameters::new(), None)
        .await
        .unwrap();

    assert_eq!(solver.state(), SolverState::Finished);
    assert_eq!(result.nb_solutions(), 1);
    assert_eq!(result.objective(), Some(20.0));

    let best = result.best_solution.as_ref().unwrap();
    let x_start = best.get_start(tasks.x).unwrap();
    let x_end = best.get_end(tasks.x).unwrap();
    let y_end = best.get_end(tasks.y).unwrap();
    assert!(y_end >= x_end);
    assert!(x_end >= x_start + 10);
    assert!(result.summary.as_ref().unwrap().nb_solutions >= 1);
}

#[tokio::test]
async fn test_alternative_scenario() {
    let alt = models::alternative().unwrap();
    let engine = FakeEngine::solving(|m| {
        models::alternative_solution(m, 5, false)
            .into_iter()
            .collect()
    });
    let mut solver = solver(&engine);

    let result = solver
        .solve(&alt.model, &Parameters::new(), None)
        .await
        .unwrap();
    let best = result.best_solution.unwrap();

    assert!(best.is_present(alt.main));
    assert_ne!(best.is_present(alt.a), best.is_present(alt.b));
    let chosen = if best.is_present(alt.a) { alt.a } else { alt.b };
    assert_eq!(best.get_start(chosen), best.get_start(alt.main));
    assert_eq!(best.get_end(chosen), best.get_end(alt.main));
}

#[tokio::test]
async fn test_no_overlap_scenario() {
    let no = models::no_overlap().unwrap();
    let engine = FakeEngine::solving(|m| {
        models::no_overlap_solution(m, 10, 0)
            .into_iter()
            .collect()
    });
    let mut solver = solver(&engine);

    let result = solver
        .solve(&no.model, &Parameters::new(), None)
        .await
        .unwrap();
    let best = result.best_solution.unwrap();

    let (a_start, a_end) = (best.get_start(no.a).unwrap(), best.get_end(no.a).unwrap());
    let (b_start, b_end) = (best.get_start(no.b).unwrap(), best.get_end(no.b).unwrap());
    assert!(a_end <= b_start || b_end <= a_start);
}

#[tokio::test]
async fn test_histories_and_best_solution() {
    let tasks = models::two_tasks().unwrap();
    let engine = FakeEngine::new(|request| {
        let EngineRequest::Solve { model, .. } = request else {
            return Vec::new();
        };
        vec![
            Reply::Solution {
                solve_time: 0.1,
                solution: models::two_tasks_solution(model, 5).unwrap(),
            },
            Reply::lower_bound(0.2, 15.0),
            Reply::Solution {
                solve_time: 0.3,
                solution: models::two_tasks_solution(model, 0).unwrap(),
            },
            Reply::lower_bound(0.4, 20.0),
            Reply::summary(2, Some(20.0)),
        ]
    });
    let mut solver = solver(&engine);

    let result = solver
        .solve(&tasks.model, &Parameters::new(), None)
        .await
        .unwrap();

    assert_eq!(result.solution_history.len(), 2);
    assert_eq!(result.solution_history[0].objective.value(), Some(25.0));
    assert_eq!(result.lower_bound_history.len(), 2);
    assert_eq!(result.best_lower_bound, Some(20.0));
    assert_eq!(result.best_solution_time, Some(0.3));
    assert_eq!(result.objective(), Some(20.0));
    assert!(result.proof());
}

#[tokio::test]
async fn test_verified_solutions_are_flagged() {
    let tasks = models::two_tasks().unwrap();
    let engine = two_task_engine();
    let mut solver = solver(&engine);
    let params = Parameters {
        verify_solutions: Some(true),
        ..Parameters::default()
    };

    let result = solver.solve(&tasks.model, &params, None).await.unwrap();
    assert_eq!(result.best_solution_valid, Some(true));
}

#[tokio::test]
async fn test_warm_start_reaches_engine() {
    let tasks = models::two_tasks().unwrap();
    let engine = two_task_engine();
    let mut solver = solver(&engine);
    let warm = models::two_tasks_solution(&tasks.model, 3).unwrap();

    solver
        .solve(&tasks.model, &Parameters::new(), Some(&warm))
        .await
        .unwrap();

    let requests = engine.requests();
    let EngineRequest::Solve {
        model, warm_start, ..
    } = &requests[0]
    else {
        panic!("expected a solve command");
    };
    let warm_start = warm_start.as_ref().unwrap();
    let x = model.interval_var_by_name("x").unwrap();
    assert_eq!(warm_start.get_start(x), Some(3));
}

#[tokio::test]
async fn test_client_side_parameters_stay_local() {
    let tasks = models::two_tasks().unwrap();
    let engine = two_task_engine();
    let mut solver = solver(&engine);
    let params = Parameters::new()
        .with_solver("/opt/engine")
        .with_time_limit(5.0);

    solver.solve(&tasks.model, &params, None).await.unwrap();

    let requests = engine.requests();
    let EngineRequest::Solve { parameters, .. } = &requests[0] else {
        panic!("expected a solve command");
    };
    assert_eq!(parameters.solver, None);
    assert_eq!(parameters.time_limit, Some(5.0));
}

#[tokio::test]
async fn test_propagate_and_to_text() {
    let tasks = models::two_tasks().unwrap();
    let engine = two_task_engine();

    let propagation = solver(&engine)
        .propagate(&tasks.model, &Parameters::new())
        .await
        .unwrap()
        .unwrap();
    assert!(!propagation.is_infeasible());

    let text = solver(&engine)
        .to_text(&tasks.model, &Parameters::new(), None)
        .await
        .unwrap();
    assert_eq!(text.as_deref(), Some("two-tasks"));
    assert_eq!(engine.launches(), 2);
}

// ============================================================================
// Events
// ============================================================================

mod events {
    use super::*;

    #[tokio::test]
    async fn test_summary_is_last_data_event_and_close_is_last() {
        let tasks = models::two_tasks().unwrap();
        let engine = FakeEngine::new(|request| {
            let EngineRequest::Solve { model, .. } = request else {
                return Vec::new();
            };
            vec![
                Reply::log("starting"),
                Reply::trace("trace line"),
                Reply::Solution {
                    solve_time: 0.1,
                    solution: models::two_tasks_solution(model, 0).unwrap(),
                },
                Reply::warning("careful"),
                Reply::lower_bound(0.2, 20.0),
                Reply::summary(1, Some(20.0)),
            ]
        });
        let mut solver = solver(&engine);
        let rx = solver.subscribe();

        solver
            .solve(&tasks.model, &Parameters::new(), None)
            .await
            .unwrap();
        let kinds: Vec<_> = drain(rx).await.iter().map(kind).collect();

        assert_eq!(
            kinds,
            vec![
                "log",
                "trace",
                "solution",
                "warning",
                "lowerBound",
                "summary",
                "close"
            ]
        );
    }

    #[tokio::test]
    async fn test_callbacks_and_unsubscribe() {
        let tasks = models::two_tasks().unwrap();
        let engine = FakeEngine::new(|request| {
            let EngineRequest::Solve { .. } = request else {
                return Vec::new();
            };
            vec![
                Reply::log("one"),
                Reply::log("two"),
                Reply::summary(0, None),
            ]
        });
        let mut solver = solver(&engine);
        let (logs, sink) = counter();
        let (removed, removed_sink) = counter();
        let (closed, closed_sink) = counter();

        solver.on_log(move |text| sink.lock().unwrap().push(text.to_string()));
        let id = solver.on_log(move |text| removed_sink.lock().unwrap().push(text.to_string()));
        solver.on_close(move || closed_sink.lock().unwrap().push("close".into()));
        assert!(solver.unsubscribe(id));
        assert!(!solver.unsubscribe(id));

        solver
            .solve(&tasks.model, &Parameters::new(), None)
            .await
            .unwrap();

        assert_eq!(*logs.lock().unwrap(), vec!["one", "two"]);
        assert!(removed.lock().unwrap().is_empty());
        assert_eq!(closed.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_fragmented_lines_are_reassembled() {
        let tasks = models::two_tasks().unwrap();
        let engine = FakeEngine::new(|request| {
            let EngineRequest::Solve { .. } = request else {
                return Vec::new();
            };
            vec![
                Reply::Fragmented {
                    line: r#"{"msg":"log","data":"split across writes"}"#.into(),
                    chunk: 3,
                },
                Reply::Fragmented {
                    line: r#"{"msg":"summary","nbSolutions":0,"duration":0.5,"proof":false}"#
                        .into(),
                    chunk: 7,
                },
            ]
        });
        let mut solver = solver(&engine);
        let (logs, sink) = counter();
        solver.on_log(move |text| sink.lock().unwrap().push(text.to_string()));

        let result = solver
            .solve(&tasks.model, &Parameters::new(), None)
            .await
            .unwrap();

        assert_eq!(*logs.lock().unwrap(), vec!["split across writes"]);
        assert_eq!(result.duration(), Some(0.5));
    }
}

// ============================================================================
// Errors
// ============================================================================

mod errors {
    use super::*;

    #[tokio::test]
    async fn test_second_command_is_rejected() {
        let tasks = models::two_tasks().unwrap();
        let engine = two_task_engine();
        let mut solver = solver(&engine);

        solver
            .solve(&tasks.model, &Parameters::new(), None)
            .await
            .unwrap();
        let err = solver
            .solve(&tasks.model, &Parameters::new(), None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SolverError::InvalidState(SolverState::Finished)
        ));
        assert_eq!(engine.launches(), 1);
    }

    #[tokio::test]
    async fn test_hangup_is_a_transport_error_and_still_closes() {
        let tasks = models::two_tasks().unwrap();
        let engine = FakeEngine::new(|_| vec![Reply::log("working"), Reply::Hangup]);
        let mut solver = solver(&engine);
        let rx = solver.subscribe();

        let err = solver
            .solve(&tasks.model, &Parameters::new(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, SolverError::Transport(_)));
        assert_eq!(solver.state(), SolverState::Errored);
        let kinds: Vec<_> = drain(rx).await.iter().map(kind).collect();
        assert_eq!(kinds, vec!["log", "error", "close"]);
    }

    #[tokio::test]
    async fn test_unavailable_engine() {
        let tasks = models::two_tasks().unwrap();
        let engine = FakeEngine::unavailable();
        let mut solver = solver(&engine);
        let (closed, closed_sink) = counter();
        solver.on_close(move || closed_sink.lock().unwrap().push("close".into()));

        let err = solver
            .solve(&tasks.model, &Parameters::new(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, SolverError::Transport(_)));
        assert_eq!(closed.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_engine_error_without_listener_rejects() {
        let tasks = models::two_tasks().unwrap();
        let engine = FakeEngine::new(|_| vec![Reply::error("out of memory")]);
        let mut solver = solver(&engine);

        let err = solver
            .solve(&tasks.model, &Parameters::new(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, SolverError::Engine(ref m) if m == "out of memory"));
    }

    #[tokio::test]
    async fn test_error_listener_suppresses_rejection() {
        let tasks = models::two_tasks().unwrap();
        let engine = FakeEngine::new(|request| {
            let EngineRequest::Solve { model, .. } = request else {
                return Vec::new();
            };
            vec![
                Reply::Solution {
                    solve_time: 0.1,
                    solution: models::two_tasks_solution(model, 0).unwrap(),
                },
                Reply::error("worker crashed"),
            ]
        });
        let mut solver = solver(&engine);
        let (errors, sink) = counter();
        solver.on_error(move |e| sink.lock().unwrap().push(e.to_string()));

        let result = solver
            .solve(&tasks.model, &Parameters::new(), None)
            .await
            .unwrap();

        assert_eq!(solver.state(), SolverState::Errored);
        assert!(result.summary.is_none());
        assert_eq!(result.solution_history.len(), 1);
        assert_eq!(*errors.lock().unwrap(), vec!["engine error: worker crashed"]);
    }

    #[tokio::test]
    async fn test_malformed_line_carries_raw_text() {
        let tasks = models::two_tasks().unwrap();
        let engine = FakeEngine::new(|_| vec![Reply::Raw("not json at all".into())]);
        let mut solver = solver(&engine);

        let err = solver
            .solve(&tasks.model, &Parameters::new(), None)
            .await
            .unwrap_err();

        match err {
            SolverError::InvalidMessage { line, .. } => assert_eq!(line, "not json at all"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_solution_is_a_protocol_error() {
        let tasks = models::two_tasks().unwrap();
        let engine = FakeEngine::new(|_| {
            vec![Reply::Raw(
                r#"{"msg":"solution","solveTime":0.1,"valid":false,"values":[]}"#.into(),
            )]
        });
        let mut solver = solver(&engine);

        let err = solver
            .solve(&tasks.model, &Parameters::new(), None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SolverError::InvalidMessage {
                source: WireError::InvalidSolution,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_unknown_solution_id_is_a_protocol_error() {
        let tasks = models::two_tasks().unwrap();
        let engine = FakeEngine::new(|_| {
            vec![Reply::Raw(
                r#"{"msg":"solution","solveTime":0.1,"values":[{"id":42,"value":1}]}"#.into(),
            )]
        });
        let mut solver = solver(&engine);

        let err = solver
            .solve(&tasks.model, &Parameters::new(), None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SolverError::InvalidMessage {
                source: WireError::UnknownId(42),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_wrong_terminal_event() {
        let tasks = models::two_tasks().unwrap();
        let engine = FakeEngine::new(|_| vec![Reply::text("not a summary")]);
        let mut solver = solver(&engine);

        let err = solver
            .solve(&tasks.model, &Parameters::new(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, SolverError::Protocol(WireError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_engine_side_verification_failure() {
        let tasks = models::two_tasks().unwrap();
        let engine = FakeEngine::new(|request| {
            let EngineRequest::Solve { model, .. } = request else {
                return Vec::new();
            };
            let x = model.interval_var_by_name("x").unwrap();
            let y = model.interval_var_by_name("y").unwrap();
            let mut overlapping = Solution::new();
            overlapping.set_interval(x, 0, 10);
            overlapping.set_interval(y, 5, 15);
            vec![Reply::Solution {
                solve_time: 0.1,
                solution: overlapping,
            }]
        });
        let mut solver = solver(&engine);

        let err = solver
            .solve(&tasks.model, &Parameters::new(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, SolverError::Engine(ref m) if m.contains("verification failed")));
    }
}

// ============================================================================
// Handle
// ============================================================================

mod handle {
    use super::*;

    fn waiting_engine() -> FakeEngine {
        FakeEngine::new(|request| match request {
            EngineRequest::Solve { .. } => vec![
                Reply::log("ready"),
                Reply::WaitForStop,
                Reply::summary(0, None),
            ],
            _ => Vec::new(),
        })
    }

    #[tokio::test]
    async fn test_stop_reaches_engine() {
        let tasks = models::two_tasks().unwrap();
        let engine = waiting_engine();
        let mut solver = solver(&engine);
        let handle = solver.handle();
        let statuses = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&statuses);
        solver.on_log(move |_| seen.lock().unwrap().push(handle.stop("user")));

        solver
            .solve(&tasks.model, &Parameters::new(), None)
            .await
            .unwrap();

        assert_eq!(*statuses.lock().unwrap(), vec![CommandStatus::Queued]);
        assert!(engine
            .requests()
            .iter()
            .any(|r| matches!(r, EngineRequest::Stop { reason } if reason == "user")));
    }

    #[tokio::test]
    async fn test_commands_outside_a_run_are_no_ops() {
        let tasks = models::two_tasks().unwrap();
        let engine = two_task_engine();
        let mut solver = solver(&engine);
        let handle = solver.handle();
        let warm = models::two_tasks_solution(&tasks.model, 0).unwrap();

        assert_eq!(handle.stop("early"), CommandStatus::NotRunning);
        assert_eq!(
            handle.send_solution(&warm).unwrap(),
            CommandStatus::NotRunning
        );

        solver
            .solve(&tasks.model, &Parameters::new(), None)
            .await
            .unwrap();

        assert_eq!(handle.stop("late"), CommandStatus::NotRunning);
        assert_eq!(
            handle.send_solution(&warm).unwrap(),
            CommandStatus::NotRunning
        );
        assert_eq!(engine.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_send_solution_while_running() {
        let tasks = models::two_tasks().unwrap();
        let engine = waiting_engine();
        let mut solver = solver(&engine);
        let handle = solver.handle();
        let external = models::two_tasks_solution(&tasks.model, 7).unwrap();

        let mut foreign_model = Model::new();
        let foreign = foreign_model.interval_var().length(1).build().unwrap();
        let mut foreign_solution = Solution::new();
        foreign_solution.set_interval(foreign, 0, 1);

        let outcomes = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&outcomes);
        solver.on_log(move |_| {
            let mut seen = seen.lock().unwrap();
            seen.push(format!("{:?}", handle.send_solution(&external).unwrap()));
            let rejected = matches!(
                handle.send_solution(&foreign_solution),
                Err(SolverError::Protocol(_))
            );
            seen.push(format!("foreign rejected: {rejected}"));
            seen.push(format!("{:?}", handle.stop("done")));
        });

        solver
            .solve(&tasks.model, &Parameters::new(), None)
            .await
            .unwrap();

        assert_eq!(
            *outcomes.lock().unwrap(),
            vec!["Queued", "foreign rejected: true", "Queued"]
        );
        let requests = engine.requests();
        assert_eq!(requests.len(), 3);
        let EngineRequest::Solution(wire) = &requests[1] else {
            panic!("expected an injected solution");
        };
        assert_eq!(wire.values.len(), 2);
        assert!(matches!(requests[2], EngineRequest::Stop { .. }));
    }
}

// ============================================================================
// Output
// ============================================================================

mod output {
    use super::*;

    #[tokio::test]
    async fn test_text_channels_are_teed() {
        let tasks = models::two_tasks().unwrap();
        let engine = FakeEngine::new(|_| {
            vec![
                Reply::log("first\nsecond"),
                Reply::warning("third"),
                Reply::summary(0, None),
            ]
        });
        let (sink, mut peer) = tokio::io::duplex(4096);
        let mut solver = solver(&engine).with_output(sink);

        solver
            .solve(&tasks.model, &Parameters::new(), None)
            .await
            .unwrap();
        drop(solver);

        let mut written = String::new();
        peer.read_to_string(&mut written).await.unwrap();
        assert_eq!(written, "first\nsecond\nthird\n");
    }

    #[tokio::test]
    async fn test_failing_sink_stops_the_engine() {
        let tasks = models::two_tasks().unwrap();
        let engine = FakeEngine::new(|_| {
            vec![
                Reply::log("ready"),
                Reply::WaitForStop,
                Reply::summary(0, None),
            ]
        });
        let (sink, peer) = tokio::io::duplex(64);
        drop(peer);
        let mut solver = solver(&engine).with_output(sink);

        solver
            .solve(&tasks.model, &Parameters::new(), None)
            .await
            .unwrap();

        assert!(engine.requests().iter().any(
            |r| matches!(r, EngineRequest::Stop { reason } if reason == "output sink failed")
        ));
    }
}
