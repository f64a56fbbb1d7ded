/// Upstream data clients.
///
/// Submodules:
/// - `safetydata` — the MOIS SafetyData reservoir storage API.

pub mod safetydata;
