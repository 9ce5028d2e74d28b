use crate::advisory::AdvisoryRequest;

/// Fixed-structure prompt asking for a terse two-sentence mission report.
pub fn build_prompt(request: &AdvisoryRequest) -> String {
    format!(
        "You are the onboard analysis computer of a deep-space survey vessel.\n\
         Assess this near-earth object:\n\
         - Name: {name}\n\
         - Estimated diameter: {diameter:.3} km\n\
         - Relative velocity: {velocity:.2} km/h\n\
         - Miss distance: {distance:.2} km\n\
         - Risk level: {risk}\n\
         \n\
         Reply with exactly two sentences in the style of a military mission report.\n\
         Do not use markdown. Keep the tone serious and scientific.",
        name = request.name,
        diameter = request.diameter_km,
        velocity = request.velocity_kmh,
        distance = request.miss_distance_km,
        risk = request.risk_level,
    )
}
