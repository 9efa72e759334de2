//! Integration tests for rpl-sim.

use rpl_core::{
    global_addr, CoreResult, DisMode, EventLog, LinkAddr, LogRecord, MemoryLog, NodeId, Settings,
    Tick, TrickleVariant,
};
use rpl_sched::{SchedError, StopReason};

use crate::{SimBuilder, SimError, Topology};

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Imin = 128 ms, 10 ms slots, a bit over 50 s of simulated time.
fn fast_settings() -> Settings {
    Settings {
        seed: 7,
        total_slotframes: 50,
        dio_interval_min_exp: 7,
        dio_interval_doublings: 4,
        etx_default: 1.0,
        dis_period_ms: 1_000,
        dao_period_ms: 1_000,
        ..Settings::default()
    }
}

fn node(i: u32) -> NodeId {
    NodeId(i)
}

/// Panics when asked to record a given kind of event.
#[derive(Default)]
struct PanicLog {
    panic_on: &'static str,
    flushes:  usize,
}

impl EventLog for PanicLog {
    fn record(&mut self, _tick: Tick, record: LogRecord) {
        if record.kind() == self.panic_on {
            panic!("refusing to record {}", self.panic_on);
        }
    }

    fn flush(&mut self) -> CoreResult<()> {
        self.flushes += 1;
        Ok(())
    }
}

// ── Topology ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod topology {
    use super::*;

    #[test]
    fn line_links_neighbors_only() {
        let t = Topology::line(3, 0.8).unwrap();
        assert_eq!(t.len(), 3);
        assert_eq!(t.neighbors(node(1)), &[node(0), node(2)]);
        assert_eq!(t.neighbors(node(2)), &[node(1)]);
        assert_eq!(t.pdr(node(0), node(1)), 0.8);
        assert_eq!(t.pdr(node(0), node(2)), 0.0);
        assert_eq!(t.link_count(), 4);
    }

    #[test]
    fn full_mesh_links_everyone() {
        let t = Topology::full_mesh(4, 1.0).unwrap();
        assert_eq!(t.link_count(), 12);
        assert_eq!(t.neighbors(node(3)).len(), 3);
    }

    #[test]
    fn links_are_directed() {
        let mut t = Topology::new(2);
        t.add_link(node(0), node(1), 0.5).unwrap();
        assert_eq!(t.pdr(node(0), node(1)), 0.5);
        assert_eq!(t.pdr(node(1), node(0)), 0.0);
        // Overwriting keeps a single neighbor entry.
        t.add_link(node(0), node(1), 0.9).unwrap();
        assert_eq!(t.neighbors(node(0)), &[node(1)]);
        assert_eq!(t.pdr(node(0), node(1)), 0.9);
    }

    #[test]
    fn bad_links_rejected() {
        let mut t = Topology::new(2);
        assert!(t.add_link(node(0), node(0), 1.0).is_err());
        assert!(t.add_link(node(0), node(5), 1.0).is_err());
        assert!(t.add_link(node(0), node(1), 1.5).is_err());
        assert!(t.add_link(node(0), node(1), f64::NAN).is_err());
    }
}

// ── SimBuilder validation ─────────────────────────────────────────────────────

#[cfg(test)]
mod builder_tests {
    use super::*;

    #[test]
    fn boots_every_node_and_sets_end() {
        let s = fast_settings();
        let sim = SimBuilder::new(s.clone(), Topology::line(3, 1.0).unwrap()).build().unwrap();
        assert_eq!(sim.queue.len(), 3);
        assert_eq!(sim.queue.end_tick(), Some(s.end_tick()));
        assert!(sim.mote(node(0)).unwrap().rpl.is_root());
        assert!(!sim.mote(node(2)).unwrap().rpl.is_root());
    }

    #[test]
    fn empty_topology_errors() {
        let result = SimBuilder::new(fast_settings(), Topology::new(0)).build();
        assert!(matches!(result, Err(SimError::Config(_))));
    }

    #[test]
    fn root_out_of_range_errors() {
        let result = SimBuilder::new(fast_settings(), Topology::line(2, 1.0).unwrap())
            .root(node(9))
            .build();
        assert!(matches!(result, Err(SimError::Config(_))));
    }

    #[test]
    fn invalid_settings_error() {
        let s = Settings { k_max: 0, ..fast_settings() };
        let result = SimBuilder::new(s, Topology::line(2, 1.0).unwrap()).build();
        assert!(matches!(result, Err(SimError::Core(_))));
    }
}

// ── Runs ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod runs {
    use super::*;

    #[test]
    fn line_forms_a_chain() {
        let mut sim = SimBuilder::new(fast_settings(), Topology::line(4, 1.0).unwrap())
            .log(MemoryLog::new())
            .build()
            .unwrap();
        let outcome = sim.run().unwrap();
        assert_eq!(outcome.reason, StopReason::Terminated);
        assert_eq!(outcome.last_tick, sim.settings().end_tick());
        assert_eq!(sim.joined_count(), 4);

        for report in sim.reports().unwrap() {
            let i = report.node.0;
            assert_eq!(report.state.rank, Some(256 * (i + 1)));
            assert_eq!(report.dag_rank, Some(i + 1));
            if i > 0 {
                assert_eq!(report.state.preferred_parent, Some(LinkAddr::of(node(i - 1))));
                assert!(report.joined);
            }
        }

        let root = &sim.mote(node(0)).unwrap().rpl;
        assert_eq!(
            root.compute_source_route(global_addr(LinkAddr::of(node(3)))),
            Some(vec![
                global_addr(LinkAddr::of(node(1))),
                global_addr(LinkAddr::of(node(2))),
                global_addr(LinkAddr::of(node(3))),
            ])
        );
        assert!(root.counters().dio_trickle_sent > 0);
        assert_eq!(sim.net.frames.lost, 0);
        assert_eq!(sim.log().count_kind("joined"), 3);
        assert!(sim.net.motes.iter().all(|m| m.shared.ops > 0));
    }

    #[test]
    fn same_seed_same_run() {
        let build = || {
            SimBuilder::new(fast_settings(), Topology::line(5, 0.7).unwrap())
                .log(MemoryLog::new())
                .build()
                .unwrap()
        };
        let (mut a, mut b) = (build(), build());
        a.run().unwrap();
        b.run().unwrap();
        assert_eq!(a.reports().unwrap(), b.reports().unwrap());
        assert_eq!(a.log().entries(), b.log().entries());
        assert_eq!(a.net.frames, b.net.frames);
    }

    #[test]
    fn isolated_node_keeps_soliciting() {
        let mut sim = SimBuilder::new(fast_settings(), Topology::new(2)).build().unwrap();
        sim.run().unwrap();
        assert_eq!(sim.joined_count(), 1);
        let orphan = &sim.mote(node(1)).unwrap().rpl;
        assert_eq!(orphan.rank(), None);
        assert!(orphan.counters().dis_sent > 1);
    }

    #[test]
    fn run_until_pauses_and_resumes() {
        let mut sim = SimBuilder::new(fast_settings(), Topology::line(3, 1.0).unwrap()).build().unwrap();
        let paused = sim.run_until(Tick(1)).unwrap();
        assert_eq!(paused.reason, StopReason::Paused);
        assert_eq!(sim.now(), Tick(1));
        assert_eq!(sim.joined_count(), 1);

        let done = sim.run().unwrap();
        assert_eq!(done.reason, StopReason::Terminated);
        assert_eq!(sim.joined_count(), 3);
    }

    #[test]
    fn operator_reset_between_runs() {
        let mut sim = SimBuilder::new(fast_settings(), Topology::line(3, 1.0).unwrap())
            .log(MemoryLog::new())
            .build()
            .unwrap();
        sim.run_until(Tick(2_000)).unwrap();
        let before = sim.mote(node(0)).unwrap().rpl.trickle().state().reset_count;

        assert!(sim.reset_trickle(node(0)).unwrap());
        let trickle = sim.mote(node(0)).unwrap().rpl.trickle().state();
        assert_eq!(trickle.reset_count, before + 1);
        assert_eq!(trickle.interval, 128);
        assert!(sim.reset_trickle(node(9)).is_err());

        assert_eq!(sim.run().unwrap().reason, StopReason::Terminated);
        assert_eq!(sim.joined_count(), 3);
    }

    #[test]
    fn unicast_dis_converges() {
        let s = Settings { dis_mode: DisMode::Unicast, ..fast_settings() };
        let mut sim = SimBuilder::new(s, Topology::line(3, 1.0).unwrap()).build().unwrap();
        sim.run().unwrap();
        assert_eq!(sim.joined_count(), 3);
    }

    #[test]
    fn every_variant_converges() {
        for variant in [
            TrickleVariant::Classic,
            TrickleVariant::QTrickle,
            TrickleVariant::Riata,
            TrickleVariant::Acpb,
        ] {
            let s = Settings { trickle_variant: variant, ..fast_settings() };
            let mut sim = SimBuilder::new(s, Topology::full_mesh(4, 1.0).unwrap())
                .log(MemoryLog::new())
                .build()
                .unwrap();
            sim.run().unwrap();
            assert_eq!(sim.joined_count(), 4, "{variant:?}");
            assert!(sim.log().count_kind("trickle_interval") > 0, "{variant:?}");
        }
    }

    #[test]
    fn spawned_run_joins() {
        let sim = SimBuilder::new(fast_settings(), Topology::line(3, 1.0).unwrap())
            .log(MemoryLog::new())
            .build()
            .unwrap();
        let (sim, outcome) = sim.spawn().unwrap().join().unwrap();
        assert_eq!(outcome.reason, StopReason::Terminated);
        assert_eq!(sim.joined_count(), 3);
    }
}

// ── Crashes ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod crashes {
    use super::*;

    #[test]
    fn panic_in_handler_is_reported() {
        let s = fast_settings();
        let mut sim = SimBuilder::new(s.clone(), Topology::line(2, 1.0).unwrap())
            .log(PanicLog { panic_on: "joined", flushes: 0 })
            .build()
            .unwrap();
        let err = sim.run().unwrap_err();

        let report = err.crash_report().expect("crash report");
        assert!(report.tick > Tick(1));
        assert!(report.tick < s.end_tick());
        assert_eq!(report.settings, s);
        assert!(matches!(report.error, SchedError::Panicked { .. }));
        assert_eq!(sim.log().flushes, 1);
        assert!(err.to_string().contains("refusing to record joined"));
    }

    #[test]
    fn crashed_sim_refuses_to_resume() {
        let mut sim = SimBuilder::new(fast_settings(), Topology::line(2, 1.0).unwrap())
            .log(PanicLog { panic_on: "joined", flushes: 0 })
            .build()
            .unwrap();
        let crash_tick = sim.run().unwrap_err().crash_report().expect("crash report").tick;
        assert_eq!(sim.crashed_at(), Some(crash_tick));

        assert!(matches!(sim.run(), Err(SimError::Aborted { tick }) if tick == crash_tick));
        assert!(matches!(sim.run_until(Tick(100)), Err(SimError::Aborted { .. })));
        assert!(matches!(sim.reports(), Err(SimError::Aborted { .. })));
        // Nothing ran past the crash.
        assert_eq!(sim.now(), crash_tick);
        assert_eq!(sim.log().flushes, 1);
    }

    #[test]
    fn spawned_crash_surfaces_on_join() {
        let sim = SimBuilder::new(fast_settings(), Topology::line(2, 1.0).unwrap())
            .log(PanicLog { panic_on: "dis_tx", flushes: 0 })
            .build()
            .unwrap();
        let err = sim.spawn().unwrap().join().err().expect("run should crash");
        assert_eq!(err.crash_report().map(|r| r.tick), Some(Tick(1)));
    }
}
