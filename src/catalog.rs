//! The fixed VSME Basic Module disclosure catalogue.
//!
//! Each entry declares what the synthesizer should add to its prompt and which
//! chart builders apply, so extending a disclosure means editing this table
//! rather than adding another branch to the handlers.

use serde::Serialize;

/// Chart builders a disclosure opts into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ChartCapability {
    /// Render the disclosure's first tabular response as a table
    TabularResponse,
    /// Renewable / non-renewable energy mix with percentage shares
    EnergyBreakdown,
    /// Scope 1/2/3 greenhouse gas comparison
    GhgScopes,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Disclosure {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    /// Extra drafting instructions appended to the prompt
    #[serde(skip)]
    pub guidance: &'static [&'static str],
    pub charts: &'static [ChartCapability],
    /// Whether the company profile alone is enough context to draft
    pub uses_company_profile: bool,
}

pub static DISCLOSURES: [Disclosure; 11] = [
    Disclosure {
        id: "B1",
        title: "Basis for preparation",
        description: "Reporting option chosen, whether the report is individual or consolidated, and the undertaking's legal form, sector, size, country and sites.",
        guidance: &[
            "State that the report has been prepared in accordance with the VSME standard and which module was applied.",
            "Describe the undertaking using the company profile: legal form, NACE sector, balance-sheet size, turnover, number of employees and country of primary operations.",
            "If subsidiaries or sites are listed, state whether the report is prepared on an individual or consolidated basis and name the sites with their locations.",
            "Mention any sustainability certification or label if it is reported.",
        ],
        charts: &[ChartCapability::TabularResponse],
        uses_company_profile: true,
    },
    Disclosure {
        id: "B2",
        title: "Practices, policies and future initiatives for transitioning towards a more sustainable economy",
        description: "Practices, policies and future initiatives addressing climate change, pollution, water, biodiversity, circular economy, own workforce, workers in the value chain, affected communities, consumers and business conduct.",
        guidance: &[],
        charts: &[],
        uses_company_profile: false,
    },
    Disclosure {
        id: "B3",
        title: "Energy and greenhouse gas emissions",
        description: "Total energy consumption split by renewable and non-renewable sources, and estimated gross Scope 1, Scope 2 and, where available, Scope 3 GHG emissions in tCO2e.",
        guidance: &[
            "Report total energy consumption in MWh and break it down into renewable and non-renewable electricity and fuels where the data allows.",
            "Report gross Scope 1 and location-based Scope 2 emissions in tonnes of CO2 equivalent; mention Scope 3 only when figures are provided.",
            "State the share of renewable energy in total consumption when it can be derived from the data.",
            "Do not compute emission factors or estimate missing scopes; say explicitly which figures were not reported.",
        ],
        charts: &[ChartCapability::EnergyBreakdown, ChartCapability::GhgScopes],
        uses_company_profile: false,
    },
    Disclosure {
        id: "B4",
        title: "Pollution of air, water and soil",
        description: "Pollutants emitted to air, water and soil that the undertaking already reports under legal requirements or environmental management systems.",
        guidance: &[],
        charts: &[],
        uses_company_profile: false,
    },
    Disclosure {
        id: "B5",
        title: "Biodiversity",
        description: "Number and area of sites in or near biodiversity-sensitive areas, and land-use metrics.",
        guidance: &[],
        charts: &[],
        uses_company_profile: false,
    },
    Disclosure {
        id: "B6",
        title: "Water",
        description: "Total water withdrawal, including withdrawal at sites in areas of high water stress, and water consumption where relevant.",
        guidance: &[],
        charts: &[],
        uses_company_profile: false,
    },
    Disclosure {
        id: "B7",
        title: "Resource use, circular economy and waste management",
        description: "Circular economy principles applied, total waste generated by hazardous and non-hazardous type, and waste diverted to recycling or reuse.",
        guidance: &[],
        charts: &[],
        uses_company_profile: false,
    },
    Disclosure {
        id: "B8",
        title: "Workforce - general characteristics",
        description: "Number of employees by type of contract, gender and country, and the employee turnover rate.",
        guidance: &[],
        charts: &[],
        uses_company_profile: false,
    },
    Disclosure {
        id: "B9",
        title: "Workforce - health and safety",
        description: "Number and rate of recordable work-related accidents and number of fatalities due to work-related injuries and ill health.",
        guidance: &[],
        charts: &[],
        uses_company_profile: false,
    },
    Disclosure {
        id: "B10",
        title: "Workforce - remuneration, collective bargaining and training",
        description: "Minimum wage compliance, gender pay gap, collective bargaining coverage and average training hours by gender.",
        guidance: &[],
        charts: &[],
        uses_company_profile: false,
    },
    Disclosure {
        id: "B11",
        title: "Convictions and fines for corruption and bribery",
        description: "Number of convictions and total amount of fines incurred for violation of anti-corruption and anti-bribery laws.",
        guidance: &[],
        charts: &[],
        uses_company_profile: false,
    },
];

/// Look up a disclosure by id, ignoring case and surrounding whitespace.
pub fn find(id: &str) -> Option<&'static Disclosure> {
    let id = id.trim();
    DISCLOSURES.iter().find(|d| d.id.eq_ignore_ascii_case(id))
}

/// Chart capabilities for an id; unknown ids have none.
pub fn chart_capabilities(id: &str) -> &'static [ChartCapability] {
    find(id).map(|d| d.charts).unwrap_or(&[])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalogue_is_b1_to_b11() {
        let ids: Vec<&str> = DISCLOSURES.iter().map(|d| d.id).collect();
        let expected: Vec<String> = (1..=11).map(|n| format!("B{}", n)).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_find_is_case_insensitive() {
        assert_eq!(find(" b3 ").map(|d| d.id), Some("B3"));
        assert!(find("B12").is_none());
        assert!(find("").is_none());
    }

    #[test]
    fn test_only_b1_and_b3_chart() {
        for d in DISCLOSURES.iter() {
            let expect_charts = matches!(d.id, "B1" | "B3");
            assert_eq!(!d.charts.is_empty(), expect_charts, "{}", d.id);
        }
        assert!(chart_capabilities("B99").is_empty());
    }
}
