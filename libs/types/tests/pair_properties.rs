use proptest::prelude::*;
use types::Pair;

proptest! {
    #[test]
    fn prop_display_parse_round_trip(base in "[A-Za-z0-9]{1,8}", quote in "[A-Za-z0-9]{1,8}") {
        let pair = Pair::new(&base, &quote);
        let parsed: Pair = pair.to_string().parse().unwrap();
        prop_assert_eq!(&parsed, &pair);
        prop_assert_eq!(parsed.base, base.to_uppercase());
    }

    #[test]
    fn prop_double_invert_is_identity(base in "[A-Z]{1,6}", quote in "[A-Z]{1,6}") {
        let pair = Pair::new(&base, &quote);
        prop_assert_eq!(pair.invert().invert(), pair);
    }
}
