use bn::DecFloatPointNumber;
use graph::{cross_rate, InvertNode, Node, OriginNode};
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use types::{Pair, Point, Tick};

fn dec(cents: u64) -> DecFloatPointNumber {
    format!("{}.{:02}", cents / 100, cents % 100).parse().unwrap()
}

fn tick(pair: &str, price: &DecFloatPointNumber) -> Tick {
    Tick::new(pair.parse().unwrap(), price.clone())
}

proptest! {
    #[test]
    fn prop_chained_quote_multiplies(x in 1u64..10_000_000, y in 1u64..10_000_000) {
        let (x, y) = (dec(x), dec(y));
        let result = cross_rate(&tick("A/B", &x), &tick("B/C", &y)).unwrap();
        prop_assert_eq!(result.pair, Pair::new("A", "C"));
        prop_assert_eq!(result.price.unwrap(), &x * &y);
    }

    #[test]
    fn prop_shared_quote_divides(x in 1u64..10_000_000, y in 1u64..10_000_000) {
        let (x, y) = (dec(x), dec(y));
        let result = cross_rate(&tick("A/B", &x), &tick("C/B", &y)).unwrap();
        prop_assert_eq!(result.pair, Pair::new("A", "C"));
        prop_assert_eq!(result.price.unwrap(), x.checked_div(&y).unwrap());
    }

    #[test]
    fn prop_double_invert_restores_power_of_two_prices(exp in 0u32..18) {
        // 1/2^n has n fractional digits, within the 18 extra digits of a division
        let price: DecFloatPointNumber = format!("{}", 1u64 << exp).parse().unwrap();
        let pair = Pair::new("ETH", "USD");
        let leaf = OriginNode::new("static", pair.clone(), Duration::from_secs(60), Duration::from_secs(60)).unwrap();
        leaf.record(Point::new(Tick::new(pair.clone(), price.clone()), chrono::Utc::now())).unwrap();

        let inner = Arc::new(Node::Invert(InvertNode::new(Arc::new(Node::Origin(leaf)))));
        let outer = Node::Invert(InvertNode::new(inner));
        let point = outer.data_point();
        let restored = point.tick().unwrap();
        prop_assert_eq!(&restored.pair, &pair);
        prop_assert_eq!(restored.price.as_ref().unwrap(), &price);
    }
}
