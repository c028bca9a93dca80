/// Downloadable CSV templates for bulk contributors. Header line plus two
/// example rows; only `general` carries an explicit report_type column, the
/// others rely on per-row type detection.
pub struct Template {
    pub name: &'static str,
    pub description: &'static str,
    pub content: &'static str,
}

pub const TEMPLATES: [Template; 5] = [
    Template {
        name: "service",
        description: "Entretiens et réparations",
        content: "\
vin,date,odometer_km,service_type,facility_name,description,cost,parts_type
2HGFC2F59MH528491,2025-06-15,45000,oil_change,Garage Tremblay,Vidange huile et filtre,89.99,oem
2HGFC2F59MH528491,2025-08-01,50000,brake_service,Garage Tremblay,Plaquettes avant,325.50,aftermarket
",
    },
    Template {
        name: "accident",
        description: "Accidents et collisions",
        content: "\
vin,date,severity,impact_point,airbag_deployed,structural_damage,estimated_cost,description,odometer_km
2HGFC2F59MH528491,2024-11-20,moderate,front,non,oui,4500.00,Collision avant à basse vitesse,38000
2HGFC2F59MH528491,2025-02-10,minor,rear,non,non,850.00,Accrochage stationnement,41000
",
    },
    Template {
        name: "inspection",
        description: "Inspections mécaniques",
        content: "\
vin,date,result,odometer_km,inspection_type,inspector_name,facility_name,notes
2HGFC2F59MH528491,2025-03-01,pass,42000,saaq_mecanique,J. Bouchard,Centre SAAQ Laval,
2HGFC2F59MH528491,2023-03-05,fail,21000,saaq_mecanique,J. Bouchard,Centre SAAQ Laval,Freins arrière usés
",
    },
    Template {
        name: "ownership",
        description: "Changements de propriétaire",
        content: "\
vin,date,previous_owner_type,new_owner_type,province,sale_price,odometer_km
2HGFC2F59MH528491,2024-05-01,dealer,private,QC,21500.00,35000
2HGFC2F59MH528491,2022-01-15,fleet,dealer,QC,18000.00,12000
",
    },
    Template {
        name: "general",
        description: "Tous types (colonne report_type requise)",
        content: "\
vin,report_type,date,odometer_km,service_type,severity,impact_point,result,recall_number,facility_name,cost,description,notes
2HGFC2F59MH528491,service,2025-06-15,45000,oil_change,,,,,Garage Tremblay,89.99,Vidange huile,
2HGFC2F59MH528491,inspection,2025-03-01,42000,,,,pass,,Centre SAAQ Laval,,,RAS
",
    },
];

pub fn get(name: &str) -> Option<&'static Template> {
    TEMPLATES.iter().find(|t| t.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_templates_have_header_and_two_rows() {
        for t in &TEMPLATES {
            let lines: Vec<&str> = t.content.trim_end().lines().collect();
            assert_eq!(lines.len(), 3, "template {} should be header + 2 rows", t.name);
        }
    }

    #[test]
    fn test_every_template_starts_with_vin() {
        for t in &TEMPLATES {
            assert!(t.content.starts_with("vin,"), "template {}", t.name);
        }
    }

    #[test]
    fn test_only_general_carries_report_type() {
        for t in &TEMPLATES {
            let header = t.content.lines().next().unwrap();
            if t.name == "general" {
                assert!(header.contains("report_type"));
            } else {
                assert!(!header.contains("report_type"), "template {}", t.name);
            }
        }
    }

    #[test]
    fn test_get_by_name() {
        assert!(get("service").is_some());
        assert!(get("general").is_some());
        assert!(get("warranty").is_none());
    }
}
