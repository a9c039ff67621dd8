/*!
# dbcheck DevKit - Doublures et Utilitaires de Test

Bibliothèque facilitant les tests de dbcheck sans base de données:
- Probe scriptée (succès / échecs / latence par cible)
- Lecteur de fichiers en mémoire pour le matériel TLS
- Harness pour settings simulés et attente de cycles
*/

pub mod probe_stub;
pub mod test_utils;

pub use probe_stub::{ProbeCall, ScriptedProbe, Step, StubFileReader};
pub use test_utils::TestHarness;
