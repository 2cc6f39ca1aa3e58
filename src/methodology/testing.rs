use super::Methodology;

/// Compact but invariant-complete methodology used across the test suite.
pub(crate) const SAMPLE_METHODOLOGY_YAML: &str = r#"
metadata:
  name: Acme Digital Brand Hygiene
  version: "2.1"
scoring:
  scale:
    min: 0.0
    max: 10.0
  descriptors:
    fail:
      min: 0.0
      max: 3.0
      label: FAIL
      status: fail
      color: red
    warn:
      min: 3.0
      max: 5.5
      label: WARN
      status: warn
      color: orange
    pass:
      min: 5.5
      max: 8.0
      label: PASS
      status: pass
      color: yellow
    excellent:
      min: 8.0
      max: 10.0
      label: EXCELLENT
      status: pass
      color: green
calculation:
  formula: weighted_mean
  onsite_weight: 0.7
  offsite_weight: 0.3
  crisis_multipliers:
    minor: 0.9
    severe: 0.5
onsite_tiers:
  - name: tier_1
    label: Brand Positioning
    weight_in_onsite: 0.5
    brand_percentage: 70
    performance_percentage: 30
    triggers:
      - contains /about-us
      - about-us
      - homepage
    examples:
      - https://acme.example/
      - https://acme.example/about-us
    criteria:
      corporate_positioning:
        description: Clarity and distinctiveness of the corporate story
        weight_pct: 40
        category: brand
        requirements:
          - States who the company is and what it stands for
      trust_signals:
        description: Credentials, certifications, client logos
        weight_pct: 30
        category: brand
      call_to_action:
        description: Primary CTA visibility and relevance
        weight_pct: 30
        category: performance
  - name: tier_2
    label: Value Propositions
    weight_in_onsite: 0.3
    brand_percentage: 50
    performance_percentage: 50
    triggers:
      - contains /services/
    criteria:
      value_clarity:
        description: Outcome-led articulation of the offer
        weight_pct: 50
        category: brand
      proof_points:
        description: Quantified evidence and case references
        weight_pct: 30
        category: performance
      credibility_markers:
        description: Certifications and partner badges in context
        weight_pct: 20
        category: brand
  - name: tier_3
    label: Functional Content
    weight_in_onsite: 0.2
    brand_percentage: 30
    performance_percentage: 70
    triggers:
      - contains /resources/
    criteria:
      content_depth:
        description: Substance and usefulness of the article
        weight_pct: 60
        category: performance
      transparency:
        description: Authorship, dates, sources disclosed
        weight_pct: 40
        category: brand
offsite_channels:
  - name: owned
    label: Owned Channels
    weight_in_offsite: 0.5
    authenticity_percentage: 60
    sentiment_percentage: 40
    triggers:
      - contains linkedin.com/company
    criteria:
      profile_completeness:
        description: Profile fields, branding, recency
        weight_pct: 50
        category: authenticity
      engagement_quality:
        description: Comment tone and reply cadence
        weight_pct: 50
        category: sentiment
  - name: influenced
    label: Influenced Channels
    weight_in_offsite: 0.3
    authenticity_percentage: 50
    sentiment_percentage: 50
    triggers:
      - contains youtube.com
    criteria:
      partner_alignment:
        description: Co-branded content matches the narrative
        weight_pct: 100
        category: authenticity
  - name: independent
    label: Independent Coverage
    weight_in_offsite: 0.2
    authenticity_percentage: 40
    sentiment_percentage: 60
    triggers:
      - contains glassdoor
    criteria:
      review_sentiment:
        description: Net tone of third-party reviews
        weight_pct: 60
        category: sentiment
      mention_accuracy:
        description: Factual accuracy of independent mentions
        weight_pct: 40
        category: authenticity
gating_rules:
  broken_page:
    trigger: "404"
    penalty: 2.0
    severity: high
  placeholder_copy:
    trigger: lorem ipsum
    penalty: 1.0
    severity: medium
quality_penalties:
  lorem_ipsum:
    points: 1.0
    example: lorem ipsum
  vague_cta:
    points: 0.5
    examples:
      - click here
      - learn more
brand_messaging:
  taglines:
    - Engineering a better tomorrow
  regional_narratives:
    emea: Trusted across European infrastructure programmes
  sub_narratives:
    - Safety without compromise
  value_propositions:
    - End-to-end delivery from design to operations
  approved_ctas:
    - Talk to an expert
onsite_domains:
  - acme.example
"#;

pub(crate) fn sample_methodology() -> Methodology {
    Methodology::from_yaml(SAMPLE_METHODOLOGY_YAML, "sample").expect("sample methodology is valid")
}
