use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use foundation::{CanvasParams, DroneId, Point2, SwarmId};
use runtime::{CommandDispatcher, Rejected};
use swarm_client::{
    ArenaModel, ClientError, ConnectParams, DroneHandle, DroneStatus, EvictionPolicy,
    GoToDefaults, GoToParams, ServerConfig, Swarm, Transport,
};
use tracing::{debug, info, warn};

use crate::Command;

const ARENA: &str = "arena";
const STATUS: &str = "status";
const DRONE_STATUS: &str = "drone-status";
const CONNECT: &str = "connect";
const DISCONNECT: &str = "disconnect";
const CALIBRATE: &str = "calibrate";
const TAKEOFF: &str = "takeoff";
const LAND: &str = "land";
const GOTO: &str = "goto";
const STOP: &str = "stop";

const DRONE_SLOTS: [&str; 8] = [
    DRONE_STATUS,
    CONNECT,
    DISCONNECT,
    CALIBRATE,
    TAKEOFF,
    LAND,
    GOTO,
    STOP,
];

type Outcome = Result<(), Box<dyn Error>>;

/// One command slot per remote operation, gated on the identifiers it needs.
pub struct Console {
    arena: Arc<ArenaModel>,
    swarm: Swarm,
    drone: Option<DroneId>,
    canvas: CanvasParams,
    dispatcher: CommandDispatcher,
}

impl Console {
    pub fn new(
        config: Arc<ServerConfig>,
        swarm_id: SwarmId,
        drone: Option<DroneId>,
        canvas: CanvasParams,
        eviction: EvictionPolicy,
    ) -> Self {
        let transport = Transport::new(config);
        let arena = Arc::new(ArenaModel::new(transport.clone()));
        let swarm = Swarm::with_eviction(swarm_id, transport, eviction);

        let has_swarm = !swarm.id().as_str().trim().is_empty();
        let has_drone = has_swarm && drone.as_ref().is_some_and(|d| !d.as_str().trim().is_empty());

        let mut dispatcher = CommandDispatcher::new();
        dispatcher.register(ARENA);
        dispatcher.register_with(STATUS, Arc::new(move || has_swarm));
        for name in DRONE_SLOTS {
            dispatcher.register_with(name, Arc::new(move || has_drone));
        }

        Self {
            arena,
            swarm,
            drone,
            canvas,
            dispatcher,
        }
    }

    fn ready(&self, slot: &'static str) -> Result<(), Box<dyn Error>> {
        if self.dispatcher.can_invoke(slot) {
            return Ok(());
        }
        let needs = if slot == STATUS { "--swarm" } else { "--swarm and --drone" };
        Err(format!("'{slot}' needs a non-empty {needs}").into())
    }

    fn handle(&self) -> Result<DroneHandle, Box<dyn Error>> {
        match &self.drone {
            Some(id) => Ok(self.swarm.drone(id.clone())),
            None => Err("no drone id given".into()),
        }
    }

    pub async fn run(&self, command: Command) -> Outcome {
        match command {
            Command::Arena => self.arena_cmd().await,
            Command::Status => self.status().await,
            Command::DroneStatus => self.drone_status().await,
            Command::Connect {
                radio,
                channel,
                address,
                data_rate,
            } => {
                let params = ConnectParams {
                    radio_id: radio,
                    channel,
                    address,
                    data_rate,
                };
                self.ready(CONNECT)?;
                let drone = self.handle()?;
                let reply = self
                    .dispatcher
                    .invoke(CONNECT, || drone.connect(&params))?
                    .await?;
                println!("connect: success={}", reply.success);
                Ok(())
            }
            Command::Disconnect => {
                self.ready(DISCONNECT)?;
                let drone = self.handle()?;
                let reply = self
                    .dispatcher
                    .invoke(DISCONNECT, || drone.disconnect())?
                    .await?;
                println!("disconnect: success={}", reply.success);
                Ok(())
            }
            Command::Calibrate => {
                self.ready(CALIBRATE)?;
                let drone = self.handle()?;
                let reply = self
                    .dispatcher
                    .invoke(CALIBRATE, || drone.calibrate())?
                    .await?;
                println!("calibrate: success={}", reply.success);
                Ok(())
            }
            Command::Takeoff { z, velocity } => {
                self.ready(TAKEOFF)?;
                let drone = self.handle()?;
                let reply = self
                    .dispatcher
                    .invoke(TAKEOFF, || drone.takeoff(z, velocity))?
                    .await?;
                println!("takeoff: target_z={} duration={}s", reply.target_z, reply.duration);
                Ok(())
            }
            Command::Land { z, velocity } => {
                self.ready(LAND)?;
                let drone = self.handle()?;
                let reply = self
                    .dispatcher
                    .invoke(LAND, || drone.land(z, velocity))?
                    .await?;
                println!("land: target_z={} duration={}s", reply.target_z, reply.duration);
                Ok(())
            }
            Command::Goto {
                x,
                y,
                z,
                velocity,
                yaw,
                relative,
            } => {
                self.ready(GOTO)?;
                let drone = self.handle()?;
                let target = GoToParams {
                    x,
                    y,
                    z,
                    velocity,
                    yaw,
                    relative,
                };
                let reply = self
                    .dispatcher
                    .invoke(GOTO, || drone.go_to(target))?
                    .await?;
                println!(
                    "goto: target=({}, {}, {}) yaw={} relative={} duration={}s",
                    reply.target_x,
                    reply.target_y,
                    reply.target_z,
                    reply.target_yaw,
                    reply.relative,
                    reply.duration
                );
                Ok(())
            }
            Command::Tap { cx, cy } => self.tap(Point2::new(cx, cy)).await,
            Command::Stop => {
                self.ready(STOP)?;
                let drone = self.handle()?;
                let status = self.dispatcher.invoke(STOP, || drone.stop())?.await?;
                println!("stop: drone {} is {}", status.id, status.status);
                Ok(())
            }
            Command::Watch { interval_ms, count } => self.watch(interval_ms, count).await,
        }
    }

    async fn arena_cmd(&self) -> Outcome {
        let arena = &self.arena;
        let bounds = self.dispatcher.invoke(ARENA, || arena.refresh())?.await?;
        println!(
            "arena min={:?} max={:?}",
            bounds.min_corner(),
            bounds.max_corner()
        );
        match arena.anchors(&self.canvas) {
            Ok(corners) => {
                let corners: Vec<String> =
                    corners.iter().map(|p| format!("({:.1}, {:.1})", p.x, p.y)).collect();
                println!("canvas area corners: {}", corners.join(" "));
            }
            Err(e) => warn!(error = %e, "canvas area unavailable"),
        }
        Ok(())
    }

    /// Best effort: positions are printed without canvas coordinates when
    /// the arena cannot be fetched.
    async fn ensure_arena(&self) {
        if self.arena.is_known() {
            return;
        }
        let arena = &self.arena;
        match self.dispatcher.invoke(ARENA, || arena.refresh()) {
            Ok(pending) => {
                if let Err(e) = pending.await {
                    warn!(error = %e, "arena unavailable");
                }
            }
            Err(e) => debug!(error = %e, "arena refresh skipped"),
        }
    }

    async fn status(&self) -> Outcome {
        self.ready(STATUS)?;
        self.ensure_arena().await;
        let swarm = &self.swarm;
        let statuses = self
            .dispatcher
            .invoke(STATUS, || swarm.refresh_status())?
            .await?;
        print_statuses(&self.arena, &self.canvas, &statuses);
        Ok(())
    }

    async fn drone_status(&self) -> Outcome {
        self.ready(DRONE_STATUS)?;
        self.ensure_arena().await;
        let drone = self.handle()?;
        let status = self
            .dispatcher
            .invoke(DRONE_STATUS, || drone.update_status())?
            .await?;
        print_statuses(&self.arena, &self.canvas, std::slice::from_ref(&status));
        Ok(())
    }

    async fn tap(&self, tap: Point2) -> Outcome {
        self.ready(GOTO)?;
        self.ensure_arena().await;
        let drone = self.handle()?;
        let arena = &self.arena;
        let canvas = &self.canvas;
        let reply = self
            .dispatcher
            .invoke(GOTO, || {
                drone.go_to_canvas(arena, tap, canvas, GoToDefaults::default())
            })?
            .await?;
        println!(
            "tap ({}, {}) -> goto ({:.3}, {:.3}, {:.3}) duration={}s",
            tap.x, tap.y, reply.target_x, reply.target_y, reply.target_z, reply.duration
        );
        Ok(())
    }

    /// Polls swarm status on a fixed interval. A tick that finds the
    /// previous poll still in flight is skipped.
    async fn watch(&self, interval_ms: u64, count: Option<u64>) -> Outcome {
        self.ready(STATUS)?;
        self.ensure_arena().await;

        let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms.max(1)));
        let mut ticks = 0u64;
        let mut in_flight = tokio::task::JoinSet::new();
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);
        loop {
            if count.is_some_and(|n| ticks >= n) {
                break;
            }
            tokio::select! {
                _ = ticker.tick() => {}
                _ = &mut ctrl_c => {
                    info!("interrupted");
                    break;
                }
            }
            ticks += 1;

            let swarm = self.swarm.clone();
            let pending = match self
                .dispatcher
                .invoke(STATUS, move || async move { swarm.refresh_status().await })
            {
                Ok(pending) => pending,
                Err(Rejected::Busy(_)) => {
                    debug!(tick = ticks, "previous poll still running, skipping");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            let arena = Arc::clone(&self.arena);
            let canvas = self.canvas;
            in_flight.spawn(async move {
                match pending.await {
                    Ok(statuses) => print_statuses(&arena, &canvas, &statuses),
                    Err(e) => report_poll_error(&e),
                }
            });
            while in_flight.try_join_next().is_some() {}
        }
        while in_flight.join_next().await.is_some() {}

        let stats = self.dispatcher.metrics().slot(STATUS);
        info!(
            started = stats.started,
            skipped = stats.rejected,
            failed = stats.failed,
            "watch finished"
        );
        Ok(())
    }
}

fn report_poll_error(e: &ClientError) {
    match e.status() {
        Some(code) => warn!(status = code, "status poll rejected by server"),
        None => warn!(error = %e, "status poll failed"),
    }
}

fn print_statuses(arena: &ArenaModel, canvas: &CanvasParams, statuses: &[DroneStatus]) {
    if statuses.is_empty() {
        println!("(no drones)");
        return;
    }
    for s in statuses {
        let on_canvas = match arena.transform_to_canvas(Point2::new(s.x, s.y), canvas) {
            Ok(p) => format!("({:.1}, {:.1})", p.x, p.y),
            Err(_) => "-".to_string(),
        };
        println!(
            "{:<8} {:<12} pos=({:.2}, {:.2}, {:.2}) yaw={:.1} battery={:.0}% canvas={}",
            s.id.as_str(),
            s.status.to_string(),
            s.x,
            s.y,
            s.z,
            s.yaw,
            s.battery_percentage,
            on_canvas
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::routing::get;
    use axum::Router;
    use foundation::{CanvasParams, DroneId, SwarmId};
    use swarm_client::{EvictionPolicy, ServerConfig};

    use super::{Console, ARENA, CALIBRATE, CONNECT, GOTO, STATUS};
    use crate::Command;

    const ARENA_BODY: &str =
        r#"{"min_x": 0, "max_x": 10, "min_y": 0, "max_y": 10, "min_z": 0, "max_z": 2}"#;
    const BATCH: &str = r#"[{"id": 1, "x": 5, "y": 5, "z": 1, "status": "HOVERING", "battery_percentage": 90}]"#;

    /// Control server whose swarm status takes `status_delay` to answer.
    async fn control_server(status_delay: Duration) -> String {
        let app = Router::new()
            .route("/api/arena", get(|| async { ARENA_BODY }))
            .route(
                "/api/alpha/status",
                get(move || async move {
                    tokio::time::sleep(status_delay).await;
                    BATCH
                }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn console_at(url: &str, swarm: &str, drone: Option<&str>) -> Console {
        let config = ServerConfig::new(url, Duration::from_secs(2)).unwrap();
        Console::new(
            Arc::new(config),
            SwarmId::new(swarm),
            drone.map(DroneId::new),
            CanvasParams::new(100.0, 100.0),
            EvictionPolicy::Never,
        )
    }

    fn console(swarm: &str, drone: Option<&str>) -> Console {
        console_at("http://127.0.0.1:9", swarm, drone)
    }

    #[test]
    fn drone_commands_need_both_ids() {
        let c = console("alpha", None);
        assert!(c.ready(STATUS).is_ok());
        assert!(c.ready(CONNECT).is_err());

        let c = console("alpha", Some("1"));
        assert!(c.ready(CONNECT).is_ok());
        assert!(c.ready(GOTO).is_ok());

        let c = console("  ", Some("1"));
        assert!(c.ready(STATUS).is_err());
        assert!(c.ready(CONNECT).is_err());
    }

    #[tokio::test]
    async fn unreachable_server_surfaces_as_error() {
        let c = console("alpha", Some("1"));
        assert!(c.run(Command::Calibrate).await.is_err());
        assert!(c.dispatcher.can_invoke(CALIBRATE));
    }

    #[tokio::test]
    async fn arena_command_fetches_bounds() {
        let url = control_server(Duration::ZERO).await;
        let c = console_at(&url, "alpha", None);

        c.run(Command::Arena).await.unwrap();
        let bounds = c.arena.bounds().unwrap();
        assert_eq!(bounds.min_corner(), [0.0, 0.0, 0.0]);
        assert_eq!(bounds.max_corner(), [10.0, 10.0, 2.0]);
        assert_eq!(c.dispatcher.metrics().slot(ARENA).succeeded, 1);
    }

    #[tokio::test]
    async fn watch_skips_ticks_while_a_poll_is_running() {
        let url = control_server(Duration::from_millis(300)).await;
        let c = console_at(&url, "alpha", None);

        c.run(Command::Watch {
            interval_ms: 20,
            count: Some(5),
        })
        .await
        .unwrap();

        let stats = c.dispatcher.metrics().slot(STATUS);
        assert_eq!(stats.started + stats.rejected, 5);
        assert!(stats.rejected >= 1, "{stats:?}");
        assert_eq!(stats.failed, 0);
        assert_eq!(c.swarm.len(), 1);
    }
}
