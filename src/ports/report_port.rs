//! Report generation port trait.

use crate::domain::analysis::{BranchAnalysis, BranchOverview};
use crate::domain::equity::EquityCurve;
use crate::domain::error::SlopeFilterError;
use std::path::Path;

/// Port for writing analysis reports.
pub trait ReportPort {
    fn write_analysis(&self, analysis: &BranchAnalysis, output_path: &Path) -> Result<(), SlopeFilterError>;

    fn write_overview(&self, rows: &[BranchOverview], output_path: &Path) -> Result<(), SlopeFilterError>;

    fn write_equity(&self, curve: &EquityCurve, output_path: &Path) -> Result<(), SlopeFilterError>;
}
