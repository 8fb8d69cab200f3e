use serde_json::json;

use super::common::*;
use crate::workflows::compliance::domain::{LineItem, Numeric, PricingRule, DEFAULT_VIOLATION_TYPE};
use crate::workflows::compliance::explainer::{build_violation, pdf_location};
use crate::workflows::compliance::tolerance::check_tolerance;

fn fired(item: &LineItem, rule: &PricingRule) -> crate::workflows::compliance::Violation {
    let check = check_tolerance(item, rule).expect("evaluable");
    assert!(check.is_violation, "expected a violation");
    build_violation(item, rule, &check)
}

#[test]
fn unit_price_violation_explains_both_sides() {
    let rule = PricingRule {
        clause_reference: Some("Section 4.2".to_string()),
        notes: Some("Pallets at $45.00 each".to_string()),
        ..unit_price_rule(45)
    };
    let item = LineItem::new("L1", "Pallet freight")
        .with_service_code("FRT-01")
        .with_quantity(10i64)
        .with_unit_price(50i64);

    let violation = fired(&item, &rule);

    assert_eq!(violation.line_id, "L1");
    assert_eq!(violation.violation_type, DEFAULT_VIOLATION_TYPE);
    assert_eq!(violation.expected_price, amount(450, 0));
    assert_eq!(violation.actual_price, amount(500, 0));
    assert_eq!(violation.difference, amount(50, 0));
    assert_eq!(violation.clause_reference.as_deref(), Some("Section 4.2"));

    let reasoning = &violation.reasoning;
    assert_eq!(
        reasoning.explanation,
        "Violation detected for line item: Pallet freight Service Code: FRT-01 \
         The contract Section 4.2 specifies: Pallets at $45.00 each \
         Expected: $45.00 per unit × 10 = $450.00 \
         Invoice shows: $50.00 per unit × 10 = $500.00 \
         Difference: $50.00 over the contract limit"
    );
    assert_eq!(reasoning.expected_value.unit_price, Some(amount(45, 0)));
    assert_eq!(reasoning.expected_value.flat_fee, None);
    assert_eq!(reasoning.actual_value.quantity, amount(10, 0));
    assert_eq!(reasoning.actual_value.line_item_description, "Pallet freight");
    assert_eq!(
        reasoning.contract_requirement.notes.as_deref(),
        Some("Pallets at $45.00 each")
    );
}

#[test]
fn flat_fee_and_cap_descriptions() {
    let flat = PricingRule {
        flat_fee: Some(Numeric::from("120")),
        ..PricingRule::default()
    };
    let item = LineItem::new("L2", "Fuel surcharge").with_total_price("180.5");
    let violation = fired(&item, &flat);
    assert_eq!(violation.reasoning.expected_value.description, "$120.00 (flat fee)");
    assert_eq!(violation.reasoning.actual_value.description, "$180.50");

    let capped = cap_rule(75);
    let item = LineItem::new("L3", "Hazmat fee").with_total_price(90i64);
    let violation = fired(&item, &capped);
    assert_eq!(violation.reasoning.expected_value.description, "Maximum $75.00");
}

#[test]
fn missing_descriptions_and_references_render_blank() {
    let rule = unit_price_rule(10);
    let item = LineItem::new("L9", "").with_total_price(12i64);

    let violation = fired(&item, &rule);

    assert!(violation
        .reasoning
        .explanation
        .starts_with("Violation detected for line item: N/A The contract  specifies: "));
    assert_eq!(violation.clause_reference, None);
    assert_eq!(violation.reasoning.contract_requirement.clause_reference, None);
}

#[test]
fn amounts_are_rounded_to_cents() {
    let rule = PricingRule {
        unit_price: Some(Numeric::from("3.333")),
        ..PricingRule::default()
    };
    let item = LineItem::new("L4", "Copies")
        .with_quantity(3i64)
        .with_total_price("10.126");

    let violation = fired(&item, &rule);

    assert_eq!(violation.expected_price, amount(1000, 2));
    assert_eq!(violation.actual_price, amount(1013, 2));
    assert_eq!(violation.difference, amount(13, 2));
}

#[test]
fn pdf_location_is_copied_verbatim() {
    let location = json!({
        "pageNumber": 2,
        "bbox": { "left": 0.12, "top": 0.5, "right": 0.88, "bottom": 0.53 }
    });
    let item = LineItem::new("L5", "Storage")
        .with_total_price(300i64)
        .with_metadata(json!({ "pdf_location": location.clone(), "ocr_confidence": 0.91 }));

    let violation = fired(&item, &cap_rule(250));

    assert_eq!(violation.pdf_location, Some(location));
}

#[test]
fn pdf_location_accepts_json_encoded_metadata() {
    let encoded = json!("{\"pdf_location\": {\"pageNumber\": 3}}");
    assert_eq!(pdf_location(&encoded), Some(json!({ "pageNumber": 3 })));
}

#[test]
fn invalid_metadata_yields_no_location() {
    assert_eq!(pdf_location(&json!("not json")), None);
    assert_eq!(pdf_location(&json!(null)), None);
    assert_eq!(pdf_location(&json!({ "pdf_location": null })), None);
    assert_eq!(pdf_location(&json!([1, 2, 3])), None);
}

#[test]
fn falsy_locations_are_dropped() {
    for empty in [json!(""), json!([]), json!(false), json!({}), json!(0)] {
        assert_eq!(pdf_location(&json!({ "pdf_location": empty.clone() })), None, "{empty}");
    }
    assert_eq!(
        pdf_location(&json!({ "pdfLocation": [0.1, 0.2] })),
        Some(json!([0.1, 0.2]))
    );
}

#[test]
fn sub_cent_overage_fires_with_rounded_zero_difference() {
    let item = LineItem::new("A", "Pallet freight").with_total_price("45.004");
    let rule = unit_price_rule(45);

    let violation = fired(&item, &rule);

    assert!(violation.difference.is_zero());
    assert!(violation
        .reasoning
        .explanation
        .ends_with("Difference: $0.00 over the contract limit"));
}
