/*!
Test Harness pour dbcheck

Facilite l'écriture de tests avec:
- Probe scriptée + lecteur de fichiers en mémoire pré-câblés
- Construction rapide de cibles et de settings depuis des variables simulées
- Attente d'un cycle du prober périodique avec timeout
*/

use crate::probe_stub::{ScriptedProbe, StubFileReader};
use anyhow::Result;
use dbcheck::{ConfigError, ResultsPublisher, ResultsSnapshot, Settings, TargetDescriptor};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Harness de test complet
pub struct TestHarness {
    pub probe: ScriptedProbe,
    pub reader: StubFileReader,
    env: HashMap<String, String>,
}

impl TestHarness {
    pub fn new() -> Self {
        env_logger::try_init().ok(); // Init logging pour tests

        Self {
            probe: ScriptedProbe::new(),
            reader: StubFileReader::new(),
            env: HashMap::new(),
        }
    }

    pub fn with_probe(mut self, probe: ScriptedProbe) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_reader(mut self, reader: StubFileReader) -> Self {
        self.reader = reader;
        self
    }

    /// Simule une variable d'environnement
    pub fn set_env(&mut self, key: &str, value: &str) -> &mut Self {
        self.env.insert(key.to_string(), value.to_string());
        self
    }

    /// Déclare une cible MySQL complète à l'index donné (`None` = non indexée)
    pub fn set_mysql_target(&mut self, index: Option<usize>, name: &str, host: &str) -> &mut Self {
        let suffix = index.map(|i| format!("_{}", i)).unwrap_or_default();
        self.set_env(&format!("MYSQL_NAME{}", suffix), name)
            .set_env(&format!("MYSQL_USER{}", suffix), "root")
            .set_env(&format!("MYSQL_PASS{}", suffix), "secret")
            .set_env(&format!("MYSQL_HOST{}", suffix), host)
    }

    /// Résout les settings depuis l'environnement simulé et le lecteur stub
    pub fn settings(&self) -> Result<Settings, ConfigError> {
        let env = self.env.clone();
        Settings::from_lookup(move |key| env.get(key).cloned(), &self.reader)
    }

    pub fn probe_arc(&self) -> Arc<dyn dbcheck::Probe> {
        Arc::new(self.probe.clone())
    }

    /// Cibles MySQL `db0..dbN` sur des hôtes distincts
    pub fn targets(count: usize) -> Vec<TargetDescriptor> {
        (0..count)
            .map(|i| TargetDescriptor::mysql(format!("host{}", i), 3306, format!("db{}", i), "root", "secret"))
            .collect()
    }

    /// Attend qu'un snapshot d'au moins `cycle` soit publié
    pub async fn wait_for_cycle(publisher: &ResultsPublisher, cycle: u64, timeout: Duration) -> Result<Arc<ResultsSnapshot>> {
        let start = tokio::time::Instant::now();

        while start.elapsed() < timeout {
            let snapshot = publisher.snapshot();
            if snapshot.cycle >= cycle {
                log::info!("Snapshot cycle {} observed", snapshot.cycle);
                return Ok(snapshot);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        log::warn!("Timeout waiting for cycle {}", cycle);
        anyhow::bail!("cycle {} not published within {:?}", cycle, timeout);
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
