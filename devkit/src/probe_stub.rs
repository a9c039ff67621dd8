/*!
Probe scriptée pour tests sans base de données

Remplace `DriverProbe` : chaque cible (par nom logique) rejoue un script
d'issues (succès / échec), avec une latence optionnelle. Tous les appels
sont enregistrés pour les assertions (nombre d'essais, instants).
*/

use async_trait::async_trait;
use dbcheck::{Probe, ProbeError, TargetDescriptor, TargetId};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Up,
    Down(ProbeError),
}

impl Step {
    fn into_result(self) -> Result<(), ProbeError> {
        match self {
            Step::Up => Ok(()),
            Step::Down(e) => Err(e),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProbeCall {
    pub target: TargetId,
    pub at: Instant,
}

#[derive(Default)]
struct Script {
    queued: VecDeque<Step>,
    /// Rejouée quand la file est vide.
    fallback: Option<Step>,
    latency: Option<Duration>,
}

/// Mock probe, cloneable: les clones partagent scripts et historique.
#[derive(Clone, Default)]
pub struct ScriptedProbe {
    scripts: Arc<Mutex<HashMap<String, Script>>>,
    calls: Arc<Mutex<Vec<ProbeCall>>>,
}

impl ScriptedProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Les `count` prochains appels pour `name` échouent avec une erreur de connexion.
    pub fn fail_times(self, name: &str, count: usize) -> Self {
        {
            let mut scripts = self.scripts.lock().unwrap();
            let script = scripts.entry(name.to_string()).or_default();
            for i in 0..count {
                script
                    .queued
                    .push_back(Step::Down(ProbeError::Connect(format!("connection refused (attempt {})", i + 1))));
            }
        }
        self
    }

    /// Tous les appels pour `name` renvoient `error`, après la file éventuelle.
    pub fn always_fail(self, name: &str, error: ProbeError) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_default()
            .fallback = Some(Step::Down(error));
        self
    }

    pub fn push_step(&self, name: &str, step: Step) {
        self.scripts
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_default()
            .queued
            .push_back(step);
    }

    /// Chaque appel pour `name` dure `latency` (horloge tokio).
    pub fn with_latency(self, name: &str, latency: Duration) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_default()
            .latency = Some(latency);
        self
    }

    pub fn calls(&self) -> Vec<ProbeCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_for(&self, name: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.target.name == name)
            .count()
    }

    /// Instants des appels pour `name`, dans l'ordre.
    pub fn call_times(&self, name: &str) -> Vec<Instant> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.target.name == name)
            .map(|c| c.at)
            .collect()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
        self.scripts.lock().unwrap().clear();
    }
}

#[async_trait]
impl Probe for ScriptedProbe {
    async fn check(&self, target: &TargetDescriptor) -> Result<(), ProbeError> {
        self.calls.lock().unwrap().push(ProbeCall { target: target.id(), at: Instant::now() });

        let (step, latency) = {
            let mut scripts = self.scripts.lock().unwrap();
            match scripts.get_mut(&target.name) {
                Some(script) => {
                    let step = script
                        .queued
                        .pop_front()
                        .or_else(|| script.fallback.clone())
                        .unwrap_or(Step::Up);
                    (step, script.latency)
                }
                None => (Step::Up, None),
            }
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        log::debug!("[MOCK] probe {} -> {:?}", target, step);
        step.into_result()
    }
}

/// Lecteur de fichiers en mémoire qui compte les lectures.
#[derive(Clone, Default)]
pub struct StubFileReader {
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    reads: Arc<Mutex<Vec<String>>>,
}

impl StubFileReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, path: &str, contents: impl Into<Vec<u8>>) -> Self {
        self.files.lock().unwrap().insert(path.to_string(), contents.into());
        self
    }

    pub fn reads(&self) -> Vec<String> {
        self.reads.lock().unwrap().clone()
    }
}

impl dbcheck::FileReader for StubFileReader {
    fn read_file(&self, path: &str) -> std::io::Result<Vec<u8>> {
        self.reads.lock().unwrap().push(path.to_string());
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, format!("{} not found", path)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbcheck::FileReader;

    fn target(name: &str) -> TargetDescriptor {
        TargetDescriptor::mysql("localhost", 3306, name, "root", "pw")
    }

    #[tokio::test]
    async fn test_script_replays_then_falls_back_to_up() {
        let probe = ScriptedProbe::new().fail_times("db1", 2);

        assert!(probe.check(&target("db1")).await.is_err());
        assert!(probe.check(&target("db1")).await.is_err());
        assert!(probe.check(&target("db1")).await.is_ok());
        assert!(probe.check(&target("other")).await.is_ok());

        assert_eq!(probe.calls_for("db1"), 3);
        assert_eq!(probe.total_calls(), 4);
    }

    #[tokio::test]
    async fn test_always_fail_is_sticky() {
        let probe = ScriptedProbe::new().always_fail("db1", ProbeError::Query("deadline".into()));
        for _ in 0..3 {
            assert_eq!(probe.check(&target("db1")).await, Err(ProbeError::Query("deadline".into())));
        }
    }

    #[test]
    fn test_stub_reader_counts_reads() {
        let reader = StubFileReader::new().with_file("/ca.pem", "pem");
        assert_eq!(reader.read_file("/ca.pem").unwrap(), b"pem");
        assert!(reader.read_file("/missing").is_err());
        assert_eq!(reader.reads(), vec!["/ca.pem", "/missing"]);
    }
}
