//! Human and JSON rendering of tick reports.

use anyhow::{Context, Result};
use dwell_core::{
    DwellEvent, EntityId, EntityRegistry, FeedbackCounters, FeedbackKind, LinkRole, TickReport,
};
use dwell_scene::Scene;

pub fn name_of(scene: &Scene, id: EntityId) -> String {
    scene
        .name(id)
        .map(str::to_string)
        .unwrap_or_else(|| id.to_string())
}

pub fn role_label(role: LinkRole) -> &'static str {
    match role {
        LinkRole::Real => "real",
        LinkRole::Replica => "replica",
    }
}

pub struct Printer {
    json: bool,
}

impl Printer {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    pub fn tick(&self, scene: &Scene, report: &TickReport) -> Result<()> {
        if report.is_quiet() {
            return Ok(());
        }
        if self.json {
            let line = serde_json::to_string(report).context("failed to serialize tick report")?;
            println!("{line}");
            return Ok(());
        }

        let t = report.tick;
        for id in &report.expired {
            println!("tick {t:>6}  expired    {}", name_of(scene, *id));
        }
        for event in &report.events {
            match event {
                DwellEvent::DwellStarted { class, deviation } => {
                    println!("tick {t:>6}  dwell      {class:<4} deviation={deviation:.3}");
                }
                DwellEvent::SaccadeStarted { class, deviation } => {
                    println!("tick {t:>6}  saccade    {class:<4} deviation={deviation:.3}");
                }
            }
        }
        for probe in &report.probes {
            let a = &probe.arbitration;
            for id in &a.removed {
                println!("tick {t:>6}  removed    {}", name_of(scene, *id));
            }
            for id in &a.skipped {
                println!("tick {t:>6}  skipped    {} (no counterpart)", name_of(scene, *id));
            }
            for applied in &a.applied {
                let kind = match applied.kind {
                    FeedbackKind::Highlight => "highlight",
                    FeedbackKind::SeeThrough => "see-through",
                };
                println!(
                    "tick {t:>6}  {kind:<10} {} + {}  occlusion {:.2}/{:.2}",
                    name_of(scene, applied.entity),
                    name_of(scene, applied.counterpart),
                    applied.entity_occlusion,
                    applied.counterpart_occlusion,
                );
            }
        }
        Ok(())
    }

    pub fn summary(&self, ticks: u64, counters: FeedbackCounters) {
        if self.json {
            eprintln!(
                "ticks={ticks} near feedbacks={} far feedbacks={}",
                counters.near, counters.far
            );
            return;
        }
        println!("ticks:          {ticks}");
        println!("near feedbacks: {}", counters.near);
        println!("far feedbacks:  {}", counters.far);
    }
}
