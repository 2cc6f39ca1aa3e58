use super::testing::{SAMPLE_METHODOLOGY_YAML, sample_methodology};
use super::*;

#[test]
fn sample_methodology_passes_validation() {
    let methodology = sample_methodology();
    assert_eq!(methodology.metadata.name, "Acme Digital Brand Hygiene");
    assert_eq!(methodology.onsite_tiers.len(), 3);
    assert_eq!(methodology.offsite_channels.len(), 3);
}

#[test]
fn criterion_weights_must_sum_to_100() {
    let broken = SAMPLE_METHODOLOGY_YAML.replace("weight_pct: 40", "weight_pct: 45");
    let err = Methodology::from_yaml(&broken, "test").unwrap_err();
    assert!(matches!(
        err,
        MethodologyError::CriterionWeightSum { total: 105, .. }
    ));
}

#[test]
fn category_percentages_must_sum_to_100() {
    let broken = SAMPLE_METHODOLOGY_YAML.replace("brand_percentage: 70", "brand_percentage: 60");
    let err = Methodology::from_yaml(&broken, "test").unwrap_err();
    assert!(matches!(err, MethodologyError::CategoryMixSum { total: 90, .. }));
}

#[test]
fn descriptor_bands_must_partition_the_scale() {
    // Opens a gap between warn (ends 5.5) and pass (starts 6.0).
    let broken = SAMPLE_METHODOLOGY_YAML.replace(
        "    pass:\n      min: 5.5",
        "    pass:\n      min: 6.0",
    );
    let err = Methodology::from_yaml(&broken, "test").unwrap_err();
    assert!(matches!(err, MethodologyError::DescriptorCoverage(_)));
}

#[test]
fn crisis_multipliers_outside_unit_interval_are_rejected() {
    let broken = SAMPLE_METHODOLOGY_YAML.replace("minor: 0.9", "minor: 1.2");
    let err = Methodology::from_yaml(&broken, "test").unwrap_err();
    assert!(matches!(
        err,
        MethodologyError::CrisisMultiplier { factor, .. } if factor == 1.2
    ));
}

#[test]
fn calculation_weights_must_sum_to_one() {
    let broken = SAMPLE_METHODOLOGY_YAML.replace("offsite_weight: 0.3", "offsite_weight: 0.4");
    let err = Methodology::from_yaml(&broken, "test").unwrap_err();
    assert!(matches!(err, MethodologyError::CalculationWeights(_)));
}

#[test]
fn duplicate_unit_names_are_rejected() {
    let broken = SAMPLE_METHODOLOGY_YAML.replace("name: owned", "name: tier_1");
    let err = Methodology::from_yaml(&broken, "test").unwrap_err();
    assert!(matches!(err, MethodologyError::DuplicateUnit(name) if name == "tier_1"));
}

#[test]
fn weight_of_returns_declared_weight() {
    let methodology = sample_methodology();
    assert_eq!(
        methodology.weight_of("corporate_positioning", "tier_1").unwrap(),
        40
    );
    assert_eq!(methodology.weight_of("review_sentiment", "independent").unwrap(), 60);
}

#[test]
fn weight_of_falls_back_for_unknown_criterion_in_known_unit() {
    let methodology = sample_methodology();
    assert_eq!(
        methodology.weight_of("invented_by_llm", "tier_1").unwrap(),
        FALLBACK_CRITERION_WEIGHT
    );
}

#[test]
fn weight_of_rejects_unknown_unit() {
    let methodology = sample_methodology();
    let err = methodology.weight_of("corporate_positioning", "tier_9").unwrap_err();
    assert!(matches!(err, MethodologyError::UnknownUnit(unit) if unit == "tier_9"));
}

#[test]
fn criterion_lookup_is_typed_on_miss() {
    let methodology = sample_methodology();
    let err = methodology.criterion("tier_1", "invented").unwrap_err();
    assert!(matches!(err, MethodologyError::UnknownCriterion { .. }));
}

#[test]
fn descriptor_for_is_total_and_boundary_takes_upper_band() {
    let methodology = sample_methodology();
    assert_eq!(methodology.descriptor_for(0.0).label, "FAIL");
    assert_eq!(methodology.descriptor_for(2.99).label, "FAIL");
    // Exactly on a boundary: upper band wins.
    assert_eq!(methodology.descriptor_for(3.0).label, "WARN");
    assert_eq!(methodology.descriptor_for(8.0).label, "EXCELLENT");
    assert_eq!(methodology.descriptor_for(10.0).label, "EXCELLENT");
    // Out-of-range inputs clamp into the scale.
    assert_eq!(methodology.descriptor_for(-1.0).label, "FAIL");
    assert_eq!(methodology.descriptor_for(11.0).label, "EXCELLENT");
}

#[test]
fn classification_triggers_preserve_declaration_order() {
    let methodology = sample_methodology();
    let triggers = methodology.classification_triggers();
    assert_eq!(triggers.onsite[0].0, "tier_1");
    assert_eq!(
        triggers.onsite[0].1[0],
        TriggerRule::Contains("/about-us".to_string())
    );
    assert_eq!(triggers.onsite[0].1[2], TriggerRule::Keyword("homepage".to_string()));
    assert_eq!(triggers.offsite[0].0, "owned");
}

#[test]
fn trigger_rule_grammar_parses_all_three_forms() {
    assert_eq!(
        TriggerRule::parse("contains /services/"),
        TriggerRule::Contains("/services/".to_string())
    );
    assert_eq!(
        TriggerRule::parse("starts with https://acme.example"),
        TriggerRule::StartsWith("https://acme.example".to_string())
    );
    assert_eq!(TriggerRule::parse("blog"), TriggerRule::Keyword("blog".to_string()));
}

#[test]
fn trigger_matching_is_case_insensitive() {
    let rule = TriggerRule::Contains("/About-Us".to_string());
    assert!(rule.matches("https://acme.example/about-us"));
}

#[test]
fn quality_penalty_examples_merge_single_and_plural_forms() {
    let methodology = sample_methodology();
    let lorem = &methodology.quality_penalties["lorem_ipsum"];
    assert_eq!(lorem.all_examples().collect::<Vec<_>>(), vec!["lorem ipsum"]);
    let vague = &methodology.quality_penalties["vague_cta"];
    assert_eq!(
        vague.all_examples().collect::<Vec<_>>(),
        vec!["click here", "learn more"]
    );
}

#[test]
fn unit_weight_and_label_resolve_for_tiers_and_channels() {
    let methodology = sample_methodology();
    assert_eq!(methodology.unit_weight("tier_1"), 0.5);
    assert_eq!(methodology.unit_weight("independent"), 0.2);
    assert_eq!(methodology.unit_weight("unknown"), 0.0);
    assert_eq!(methodology.unit_label("tier_2"), "Value Propositions");
}
