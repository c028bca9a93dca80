use serde::{Deserialize, Serialize};

/// Closed set of contribution types. Each variant owns exactly one detail
/// table; the dispatch in `services::report_details` has one arm per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    Accident,
    Service,
    Ownership,
    Inspection,
    RecallCompletion,
    TitleBrand,
    Lien,
    Theft,
    ObdDiagnostic,
    Auction,
    FleetHistory,
    ImportExport,
    Emissions,
    Modification,
}

impl ReportType {
    pub const ALL: [ReportType; 14] = [
        ReportType::Accident,
        ReportType::Service,
        ReportType::Ownership,
        ReportType::Inspection,
        ReportType::RecallCompletion,
        ReportType::TitleBrand,
        ReportType::Lien,
        ReportType::Theft,
        ReportType::ObdDiagnostic,
        ReportType::Auction,
        ReportType::FleetHistory,
        ReportType::ImportExport,
        ReportType::Emissions,
        ReportType::Modification,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::Accident => "accident",
            ReportType::Service => "service",
            ReportType::Ownership => "ownership",
            ReportType::Inspection => "inspection",
            ReportType::RecallCompletion => "recall_completion",
            ReportType::TitleBrand => "title_brand",
            ReportType::Lien => "lien",
            ReportType::Theft => "theft",
            ReportType::ObdDiagnostic => "obd_diagnostic",
            ReportType::Auction => "auction",
            ReportType::FleetHistory => "fleet_history",
            ReportType::ImportExport => "import_export",
            ReportType::Emissions => "emissions",
            ReportType::Modification => "modification",
        }
    }

    pub fn parse(s: &str) -> Option<ReportType> {
        Self::ALL.iter().copied().find(|t| t.as_str() == s)
    }

    /// Detail table owning this type's 1:1 row.
    pub fn detail_table(&self) -> &'static str {
        match self {
            ReportType::Accident => "accident_reports",
            ReportType::Service => "service_records",
            ReportType::Ownership => "ownership_changes",
            ReportType::Inspection => "inspections",
            ReportType::RecallCompletion => "recall_completions",
            ReportType::TitleBrand => "title_brands",
            ReportType::Lien => "liens",
            ReportType::Theft => "theft_records",
            ReportType::ObdDiagnostic => "obd_diagnostics",
            ReportType::Auction => "auction_records",
            ReportType::FleetHistory => "fleet_history",
            ReportType::ImportExport => "import_export_records",
            ReportType::Emissions => "emissions_tests",
            ReportType::Modification => "modifications",
        }
    }

    /// Bucket name used when grouping a VIN's records in lookup responses.
    pub fn bucket(&self) -> &'static str {
        match self {
            ReportType::Accident => "accidents",
            ReportType::Service => "service_records",
            ReportType::Ownership => "ownership_changes",
            ReportType::Inspection => "inspections",
            ReportType::RecallCompletion => "recall_completions",
            ReportType::TitleBrand => "title_brands",
            ReportType::Lien => "liens",
            ReportType::Theft => "thefts",
            ReportType::ObdDiagnostic => "obd_diagnostics",
            ReportType::Auction => "auctions",
            ReportType::FleetHistory => "fleet_history",
            ReportType::ImportExport => "import_export",
            ReportType::Emissions => "emissions_tests",
            ReportType::Modification => "modifications",
        }
    }
}

impl std::fmt::Display for ReportType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contributor identity carried on every submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Submitter {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(rename = "type", default)]
    pub submitter_type: String,
    #[serde(default)]
    pub company: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trips_all_types() {
        for t in ReportType::ALL {
            assert_eq!(ReportType::parse(t.as_str()), Some(t));
        }
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert_eq!(ReportType::parse("warranty"), None);
        assert_eq!(ReportType::parse(""), None);
        assert_eq!(ReportType::parse("Accident"), None);
    }

    #[test]
    fn test_serde_names_match_as_str() {
        for t in ReportType::ALL {
            let json = serde_json::to_string(&t).unwrap();
            assert_eq!(json, format!("\"{}\"", t.as_str()));
        }
    }
}
