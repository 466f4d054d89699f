//! Progress analytics for rehearsal evaluations: trend fitting, risk
//! assessment, recommendations, completion projection and weekly patterns.

pub mod completion;
pub mod criteria;
pub mod db;
pub mod models;
pub mod patterns;
pub mod prediction;
pub mod recommendation;
pub mod report;
pub mod risk;
pub mod trend;
