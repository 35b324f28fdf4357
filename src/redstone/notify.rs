//! Alert delivery to observers and the log

use ahash::AHashMap;

use crate::core::config::AlertMessages;
use crate::core::types::BlockPos;
use crate::spatial::RegionKey;
use crate::world::WorldHost;

/// Something an operator should hear about
#[derive(Debug, Clone, PartialEq)]
pub enum Alert {
    LagMachineDetected {
        region: RegionKey,
        center: BlockPos,
        destroyed: usize,
    },
    TpsCritical {
        tps: f64,
    },
    TpsRestored {
        tps: f64,
    },
}

const MACHINE_KIND: &str = "redstone/stands";

#[derive(Debug, Clone)]
pub struct Notifier {
    messages: AlertMessages,
    console: bool,
    preferences: AHashMap<String, bool>,
}

impl Notifier {
    pub fn new(messages: AlertMessages, console: bool) -> Self {
        Self {
            messages,
            console,
            preferences: AHashMap::new(),
        }
    }

    /// Observers receive alerts unless they opted out
    pub fn alerts_enabled(&self, observer: &str) -> bool {
        self.preferences.get(observer).copied().unwrap_or(true)
    }

    pub fn set_alerts_enabled(&mut self, observer: &str, enabled: bool) {
        self.preferences.insert(observer.to_string(), enabled);
    }

    /// Fill the configured templates for an alert
    pub fn render(&self, alert: &Alert) -> Vec<String> {
        match alert {
            Alert::LagMachineDetected {
                region,
                center,
                destroyed,
            } => self
                .messages
                .lag_machine_detected
                .iter()
                .map(|template| {
                    template
                        .replace("{world}", &region.world)
                        .replace("{x}", &center.x.to_string())
                        .replace("{y}", &center.y.to_string())
                        .replace("{z}", &center.z.to_string())
                        .replace("{count}", &destroyed.to_string())
                        .replace("{type}", MACHINE_KIND)
                })
                .collect(),
            Alert::TpsCritical { tps } => fill_tps(&self.messages.tps_critical, *tps),
            Alert::TpsRestored { tps } => fill_tps(&self.messages.tps_restored, *tps),
        }
    }

    /// Send an alert to every authorized, opted-in observer
    ///
    /// Returns the number of observers reached.
    pub fn broadcast<H: WorldHost + ?Sized>(&mut self, host: &H, alert: &Alert) -> usize {
        let lines = self.render(alert);
        let mut reached = 0;

        for observer in host.authorized_observers() {
            if !self.alerts_enabled(&observer) {
                continue;
            }
            for line in &lines {
                host.send_message(&observer, line);
            }
            reached += 1;
        }

        if self.console {
            for line in &lines {
                tracing::info!(target: "lag_warden::alerts", "{}", line);
            }
        }

        reached
    }
}

fn fill_tps(templates: &[String], tps: f64) -> Vec<String> {
    let formatted = format!("{:.2}", tps);
    templates
        .iter()
        .map(|template| template.replace("{tps}", &formatted))
        .collect()
}
