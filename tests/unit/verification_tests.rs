use kyc_attest::application::{confidence, score, Verdict};
use kyc_attest::domain::KtpFields;

fn fields_from_mask(mask: u32) -> KtpFields {
    let mut fields = KtpFields::default();
    if mask & 1 != 0 {
        fields.nik = "3171234567890001".to_string();
    }
    if mask & 2 != 0 {
        fields.nama = "Budi Santoso".to_string();
    }
    if mask & 4 != 0 {
        fields.tanggal_lahir = "17-08-1990".to_string();
    }
    if mask & 8 != 0 {
        fields.alamat = "Jl. Sudirman No. 12".to_string();
    }
    fields
}

#[test]
fn test_verdict_over_all_required_field_subsets() {
    for mask in 0u32..16 {
        let fields = fields_from_mask(mask);
        let filled = mask.count_ones();
        let expected = match filled {
            4 => Verdict::Verified,
            3 => Verdict::ManualReview,
            _ => Verdict::Rejected,
        };
        assert_eq!(
            score(&fields),
            expected,
            "mask {mask:04b} with {filled} filled fields"
        );
    }
}

#[test]
fn test_confidence_is_filled_over_four() {
    assert_eq!(confidence(&fields_from_mask(0b0000)), 0.0);
    assert_eq!(confidence(&fields_from_mask(0b0001)), 0.25);
    assert_eq!(confidence(&fields_from_mask(0b0011)), 0.5);
    assert_eq!(confidence(&fields_from_mask(0b0111)), 0.75);
    assert_eq!(confidence(&fields_from_mask(0b1111)), 1.0);
}

#[test]
fn test_score_is_deterministic() {
    let fields = fields_from_mask(0b0111);
    assert_eq!(score(&fields), score(&fields.clone()));
}

#[test]
fn test_whitespace_only_field_counts_as_filled() {
    // The scorer trusts the parser's cleanup: it only checks emptiness, so a
    // parser that lets whitespace through changes the verdict.
    let mut fields = fields_from_mask(0b0111);
    fields.alamat = " ".to_string();
    assert_eq!(score(&fields), Verdict::Verified);
}
