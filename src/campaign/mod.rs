// Differential testing campaign
//
// Each round asks the generator for a batch of candidates, compiles every
// candidate against every cataloged version, and records failures whose
// signature reproduces a known bug of that version. Only the first candidate
// per (version, signature) is kept; the rest are duplicates.
//
// The driver is single-threaded. The generator and compiler sit behind
// traits so rounds can be driven by in-memory fakes.

mod driver;
mod generator;
mod state;

pub use driver::{CampaignDriver, CampaignPhase};
pub use generator::{
    collect_candidates, Candidate, ExternalGenerator, GeneratedBatch, GenerationPlan, Generator,
};
pub use state::{CampaignState, Verdict};
