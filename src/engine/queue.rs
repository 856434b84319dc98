//! Deferred-input capture and replay.

use crate::core::{ClientId, QueueKind, QueuedInput};
use crate::engine::behavioral::BehavioralFsm;
use crate::events::Event;

impl<C> BehavioralFsm<C> {
    /// Queue the in-flight input. Outside a handler there is nothing in
    /// flight and this does nothing.
    pub(crate) fn defer_resolved(&self, id: &ClientId, kind: QueueKind, until_state: Option<&str>) {
        let deferred = self
            .with_meta(id, |meta| {
                let args = meta.current_action_args.clone()?;
                let queued = QueuedInput {
                    kind,
                    until_state: until_state.map(str::to_string),
                    args,
                };
                meta.input_queue.push(queued.clone());
                Some((queued, meta.state.clone()))
            })
            .flatten();

        let Some((queued, state)) = deferred else {
            tracing::debug!(
                namespace = %self.namespace(),
                client_id = %id,
                "Ignored deferral outside of a handler"
            );
            return;
        };

        tracing::debug!(
            namespace = %self.namespace(),
            client_id = %id,
            state = ?state,
            input = %queued.args.input_type,
            kind = ?kind,
            until = ?queued.until_state,
            "Deferred input"
        );
        self.emitter().emit(&Event::Deferred {
            client_id: id.clone(),
            state,
            queued,
        });
    }

    /// Replay every queued item that is ready for `kind`, in insertion
    /// order, through the regular dispatch path.
    pub(crate) fn process_queue_resolved(&self, client: &C, id: &ClientId, kind: QueueKind) {
        let ready = self
            .with_meta(id, |meta| {
                if kind == QueueKind::UntilNextHandler {
                    if meta.draining_next_handler {
                        return None;
                    }
                    meta.draining_next_handler = true;
                }
                Some(meta.take_ready(kind))
            })
            .flatten();
        let Some(ready) = ready else {
            return;
        };

        for item in ready {
            tracing::debug!(
                namespace = %self.namespace(),
                client_id = %id,
                input = %item.args.input_type,
                kind = ?kind,
                "Replaying deferred input"
            );
            self.handle_resolved(client, id, item.args);
        }

        if kind == QueueKind::UntilNextHandler {
            self.with_meta(id, |meta| meta.draining_next_handler = false);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::core::{FsmDefinition, Input, QueueKind, QueuedInput, StateDefinition};
    use crate::engine::BehavioralFsm;
    use crate::events::Event;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn deferring_fsm() -> BehavioralFsm<&'static str> {
        BehavioralFsm::new(
            FsmDefinition::new()
                .initial_state("waiting")
                .state(
                    "waiting",
                    StateDefinition::new()
                        .action("work", |ctx| {
                            ctx.defer_until_transition(Some("ready"));
                            None
                        })
                        .action("anywhere", |ctx| {
                            ctx.defer_until_transition(None);
                            None
                        })
                        .on("warm", "warming")
                        .on("go", "ready"),
                )
                .state("warming", StateDefinition::new().on("go", "ready"))
                .state(
                    "ready",
                    StateDefinition::new()
                        .action("work", |ctx| {
                            ctx.emit("worked", ctx.arg(0).cloned().unwrap_or_default());
                            None
                        })
                        .action("anywhere", |ctx| {
                            ctx.emit("anywhere", serde_json::Value::Null);
                            None
                        }),
                ),
        )
    }

    fn custom_events(fsm: &BehavioralFsm<&'static str>) -> Arc<Mutex<Vec<String>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        fsm.on("*", move |event| {
            if let Event::Custom { name, payload } = event {
                sink.lock().unwrap().push(format!("{name}:{payload}"));
            }
        });
        seen
    }

    #[test]
    fn targeted_deferral_waits_for_its_state() {
        let fsm = deferring_fsm();
        let seen = custom_events(&fsm);

        fsm.handle(&"c", crate::core::Input::new("work").with_arg(serde_json::json!(7)))
            .unwrap();
        assert_eq!(fsm.client_meta(&"c").unwrap().input_queue.len(), 1);

        fsm.handle(&"c", "warm").unwrap();
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(fsm.client_meta(&"c").unwrap().input_queue.len(), 1);

        fsm.handle(&"c", "go").unwrap();
        assert_eq!(*seen.lock().unwrap(), ["worked:7"]);
        assert!(fsm.client_meta(&"c").unwrap().input_queue.is_empty());
    }

    #[test]
    fn untargeted_deferral_replays_on_any_transition() {
        let fsm = deferring_fsm();
        let seen = custom_events(&fsm);

        fsm.handle(&"c", "anywhere").unwrap();
        fsm.handle(&"c", "warm").unwrap();

        // Replayed in "warming", which has no handler for it.
        assert!(seen.lock().unwrap().is_empty());
        assert!(fsm.client_meta(&"c").unwrap().input_queue.is_empty());
    }

    #[test]
    fn clear_queue_prevents_replay() {
        let fsm = deferring_fsm();
        let seen = custom_events(&fsm);

        fsm.handle(&"c", "work").unwrap();
        fsm.clear_queue(&"c", None, None).unwrap();
        fsm.handle(&"c", "go").unwrap();

        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn defer_outside_handler_is_ignored() {
        let fsm = deferring_fsm();
        let deferred = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&deferred);
        fsm.on("deferred", move |_| *sink.lock().unwrap() += 1);

        fsm.defer_until_transition(&"c", Some("ready")).unwrap();
        fsm.defer_until_next_handler(&"c").unwrap();

        assert_eq!(*deferred.lock().unwrap(), 0);
        assert!(fsm.client_meta(&"c").unwrap().input_queue.is_empty());
    }

    #[test]
    fn next_handler_deferral_replays_after_handled() {
        let count = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&count);
        let fsm: BehavioralFsm<&'static str> = BehavioralFsm::new(
            FsmDefinition::new().initial_state("idle").state(
                "idle",
                StateDefinition::new()
                    .action("again", move |ctx| {
                        *counter.lock().unwrap() += 1;
                        ctx.defer_until_next_handler();
                        None
                    })
                    .on("noop", "idle"),
            ),
        );

        // The replay defers again, which waits for the following call.
        fsm.handle(&"c", "again").unwrap();
        assert_eq!(*count.lock().unwrap(), 2);
        assert_eq!(fsm.client_meta(&"c").unwrap().input_queue.len(), 1);

        fsm.handle(&"c", "noop").unwrap();
        assert_eq!(*count.lock().unwrap(), 3);
        assert_eq!(fsm.client_meta(&"c").unwrap().input_queue.len(), 1);
    }

    #[test]
    fn process_queue_can_be_driven_manually() {
        let fsm = deferring_fsm();
        let seen = custom_events(&fsm);

        fsm.handle(&"c", "anywhere").unwrap();
        fsm.transition(&"c", "ready").unwrap();
        assert_eq!(*seen.lock().unwrap(), ["anywhere:null"]);

        // Nothing left to replay.
        fsm.process_queue(&"c", QueueKind::UntilTransition).unwrap();
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn nested_handle_restores_outer_input_for_deferral() {
        let fsm: BehavioralFsm<&'static str> = BehavioralFsm::new(
            FsmDefinition::new()
                .initial_state("idle")
                .state(
                    "idle",
                    StateDefinition::new()
                        .action("outer", |ctx| {
                            ctx.handle(Input::new("inner").with_arg(json!(2)));
                            ctx.defer_until_transition(Some("ready"));
                            None
                        })
                        .action("inner", |_| None),
                )
                .state("ready", StateDefinition::new()),
        );

        fsm.handle(&"c", Input::new("outer").with_arg(json!(1)))
            .unwrap();

        let meta = fsm.client_meta(&"c").unwrap();
        assert_eq!(
            meta.input_queue,
            [QueuedInput {
                kind: QueueKind::UntilTransition,
                until_state: Some("ready".to_string()),
                args: Input::new("outer").with_arg(json!(1)),
            }]
        );
        assert!(meta.current_action_args.is_none());
    }
}
