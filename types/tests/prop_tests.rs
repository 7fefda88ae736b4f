use proptest::prelude::*;

use lattice_types::{DataId, Slot, VoteId, VoterId};

proptest! {
    /// DataId roundtrip: new -> as_bytes produces identical bytes.
    #[test]
    fn data_id_roundtrip(bytes in prop::array::uniform32(0u8..)) {
        let id = DataId::new(bytes);
        prop_assert_eq!(id.as_bytes(), &bytes);
    }

    /// DataId::is_zero is true only for all-zero bytes.
    #[test]
    fn data_id_is_zero_correct(bytes in prop::array::uniform32(0u8..)) {
        let id = DataId::new(bytes);
        prop_assert_eq!(id.is_zero(), bytes == [0u8; 32]);
    }

    /// VoteId bincode serialization roundtrip.
    #[test]
    fn vote_id_bincode_roundtrip(bytes in prop::array::uniform32(0u8..)) {
        let id = VoteId::new(bytes);
        let encoded = bincode::serialize(&id).unwrap();
        let decoded: VoteId = bincode::deserialize(&encoded).unwrap();
        prop_assert_eq!(decoded, id);
    }

    /// Slot ordering agrees with lexicographic (epoch, round) ordering.
    #[test]
    fn slot_ordering_lexicographic(
        e1 in 0u64..1000, r1 in 0u64..1000,
        e2 in 0u64..1000, r2 in 0u64..1000,
    ) {
        let a = Slot::new(e1, r1);
        let b = Slot::new(e2, r2);
        prop_assert_eq!(a < b, (e1, r1) < (e2, r2));
        prop_assert_eq!(a == b, (e1, r1) == (e2, r2));
    }

    /// next_round is strictly increasing and preserves the epoch.
    #[test]
    fn slot_next_round_increases(e in 0u64..1000, r in 0u64..1_000_000) {
        let slot = Slot::new(e, r);
        let next = slot.next_round();
        prop_assert!(next > slot);
        prop_assert_eq!(next.epoch_num, e);
        prop_assert_eq!(next.round_num, r + 1);
    }

    /// VoterId string roundtrip.
    #[test]
    fn voter_id_roundtrip(s in "[a-z0-9-]{1,24}") {
        let voter = VoterId::new(s.clone());
        prop_assert_eq!(voter.as_str(), s.as_str());
    }
}
