// handlers/mod.rs - Handlers split by trust tier
//
// Public (shared navbar token) → Protected (staff session + role gate)

pub mod protected;
pub mod public;
