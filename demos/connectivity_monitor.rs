//! Connectivity Monitor
//!
//! This example tracks several network links with one behavioral FSM and
//! a single probe with a standalone `Fsm`.
//!
//! Key concepts:
//! - One definition shared by many clients
//! - Deferring input until the client reaches a given state
//! - Catch-all handlers and lifecycle events
//! - Layering definitions with a blueprint
//!
//! Run with: cargo run --example connectivity_monitor
//! Set `RUST_LOG=statewise=debug` to see engine logs.

use serde_json::json;
use statewise::core::{Client, ClientId, FsmDefinition, Input, StateDefinition};
use statewise::engine::{Fsm, FsmError, MachineDefinition};
use statewise::events::Event;
use statewise::FsmBlueprint;
use tracing_subscriber::EnvFilter;

struct Link {
    name: String,
}

impl Client for Link {
    fn client_id(&self) -> Option<ClientId> {
        Some(ClientId::new(self.name.as_str()))
    }
}

fn base_monitor() -> FsmBlueprint<Link> {
    FsmBlueprint::new(
        FsmDefinition::new()
            .namespace("connectivity")
            .initial_state("offline")
            .state(
                "offline",
                StateDefinition::new()
                    .on("connect", "probing")
                    .action("send", |ctx| {
                        // Hold outgoing traffic until the link is up.
                        ctx.defer_until_transition(Some("online"));
                        None
                    }),
            )
            .state(
                "probing",
                StateDefinition::new()
                    .on("ack", "online")
                    .on("timeout", "offline"),
            )
            .state(
                "online",
                StateDefinition::new()
                    .on_enter(|ctx| ctx.emit("link-up", json!(ctx.client_id().as_str())))
                    .action("send", |ctx| {
                        println!(
                            "  {} sends {}",
                            ctx.client_id(),
                            ctx.arg(0).cloned().unwrap_or_default()
                        );
                        None
                    })
                    .on("drop", "offline"),
            ),
    )
}

fn run_fleet() -> Result<(), FsmError> {
    println!("--- Fleet of links (BehavioralFsm) ---\n");

    // Unknown inputs while online are logged instead of reported as noHandler.
    let monitor = base_monitor().extend(FsmDefinition::new().state(
        "online",
        StateDefinition::new().action("*", |ctx| {
            println!(
                "  {} ignored {:?}",
                ctx.client_id(),
                ctx.input_type().unwrap_or_default()
            );
            None
        }),
    ));
    let fsm = monitor.behavioral(FsmDefinition::new());

    fsm.on("*", |event| match event {
        Event::Transition {
            client_id,
            from_state,
            to_state,
            ..
        } => println!(
            "  [{client_id}] {} -> {to_state}",
            from_state.as_deref().unwrap_or("-")
        ),
        Event::Deferred {
            client_id, queued, ..
        } => println!("  [{client_id}] deferred {}", queued.args.input_type),
        Event::Custom { name, payload } => println!("  event {name}: {payload}"),
        _ => {}
    });

    let eth = Link {
        name: "eth0".to_string(),
    };
    let wifi = Link {
        name: "wlan0".to_string(),
    };

    // Both links start offline; eth0 queues a message before it is up.
    fsm.handle(&eth, Input::new("send").with_arg(json!("hello")))?;
    fsm.handle(&eth, "connect")?;
    fsm.handle(&wifi, "connect")?;
    fsm.handle(&wifi, "timeout")?;

    // The ack brings eth0 online and replays the queued message.
    fsm.handle(&eth, "ack")?;
    fsm.handle(&eth, "reboot")?;

    println!();
    for id in fsm.clients() {
        let state = fsm.meta_for(&id).and_then(|meta| meta.state);
        println!("  {id}: {}", state.as_deref().unwrap_or("-"));
    }
    Ok(())
}

fn run_probe() -> Result<(), FsmError> {
    println!("\n--- Single probe (Fsm) ---\n");

    let probe = Fsm::new(
        MachineDefinition::new()
            .namespace("probe")
            .initial_state("idle")
            .state("idle", StateDefinition::new().on("start", "running"))
            .state(
                "running",
                StateDefinition::new().action("result", |ctx| {
                    let healthy = ctx.arg(0).and_then(|v| v.as_bool()).unwrap_or(false);
                    Some(if healthy { "healthy" } else { "degraded" }.to_string())
                }),
            )
            .state("healthy", StateDefinition::new().on("start", "running"))
            .state("degraded", StateDefinition::new().on("start", "running")),
    )?;

    for healthy in [true, false] {
        probe.handle("start");
        probe.handle(Input::new("result").with_arg(json!(healthy)));
        println!(
            "  probe({healthy}) -> {} (was {})",
            probe.state().as_deref().unwrap_or("-"),
            probe.prior_state().as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

fn main() -> Result<(), FsmError> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();

    println!("=== Connectivity Monitor ===\n");
    run_fleet()?;
    run_probe()?;
    println!("\n=== Example Complete ===");
    Ok(())
}
