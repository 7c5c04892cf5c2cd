use serde::Serialize;

/// Explainer copy for one dashboard KPI.
#[derive(Debug, Clone, Serialize)]
pub struct KpiDefinition {
    pub key: &'static str,
    pub label: &'static str,
    pub meaning: &'static str,
    pub calculation: &'static str,
}

pub fn kpi_definitions() -> &'static [KpiDefinition] {
    &[
        KpiDefinition {
            key: "trend_score",
            label: "Trend Score",
            meaning: "The current momentum of the license across digital platforms.",
            calculation: "Weighted average of Google Search velocity (40%), News sentiment \
                          (30%), and Social media engagement rate (30%) relative to category \
                          baselines.",
        },
        KpiDefinition {
            key: "window",
            label: "Window",
            meaning: "The remaining duration of peak consumer demand.",
            calculation: "Estimated media lifecycle duration minus weeks elapsed since peak \
                          awareness trigger. Calibrated against historical IP decay curves.",
        },
        KpiDefinition {
            key: "impact",
            label: "Impact",
            meaning: "The projected revenue and brand reach scale.",
            calculation: "Correlation of current audience size with category-specific purchase \
                          intent data and retailer shelf-space availability.",
        },
        KpiDefinition {
            key: "confidence",
            label: "AI Confidence",
            meaning: "The statistical reliability of this sensing report.",
            calculation: "Calculated based on the density of verified data points, freshness of \
                          search signals (last 48h), and historical prediction accuracy for the \
                          specific category.",
        },
        KpiDefinition {
            key: "action",
            label: "Recommended Action",
            meaning: "The prescriptive merchandising strategy based on risk/reward.",
            calculation: "Determined by a logic matrix: (Trend Velocity x Confidence Score) vs. \
                          (Inventory Risk x Production Lead Time).",
        },
        KpiDefinition {
            key: "analog",
            label: "Historical Analog",
            meaning: "A past property used as a performance benchmark.",
            calculation: "Nearest-neighbor matching based on audience demographics, media format \
                          (Streaming vs. Cinema), and seasonal launch timing.",
        },
    ]
}
