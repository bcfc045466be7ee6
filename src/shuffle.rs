use rand::Rng;

use crate::error::{WipeError, WipeResult};

/// Geometric sweep orientation of the unshuffled reveal order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WipeDirection {
    Up,
    Down,
    Left,
    Right,
}

impl std::str::FromStr for WipeDirection {
    type Err = WipeError;

    fn from_str(s: &str) -> WipeResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            other => Err(WipeError::InvalidDirection(other.to_string())),
        }
    }
}

/// Row-major indices regrouped column-major, width columns per row.
fn transpose_indices(indices: &[u32], width: usize) -> Vec<u32> {
    let rows: Vec<&[u32]> = indices.chunks(width).collect();
    let mut out = Vec::with_capacity(indices.len());
    for col in 0..width {
        for row in &rows {
            if let Some(&v) = row.get(col) {
                out.push(v);
            }
        }
    }
    out
}

/// Unshuffled reveal order for a wipe along `direction`.
pub fn create_initial_indices(
    length: usize,
    width: usize,
    direction: WipeDirection,
) -> Vec<u32> {
    let ascending: Vec<u32> = (0..length as u32).collect();
    match direction {
        WipeDirection::Down => ascending,
        WipeDirection::Up => ascending.into_iter().rev().collect(),
        WipeDirection::Right => transpose_indices(&ascending, width),
        WipeDirection::Left => transpose_indices(&ascending, width)
            .into_iter()
            .rev()
            .collect(),
    }
}

/// Bounded shuffle of the base order: position i swaps with a position at
/// most `offset` slots ahead (clipped at the array end), never fewer than
/// one. Offset 0 therefore yields the one-step rotation, not the identity.
pub fn create_shuffled_indices(
    length: usize,
    width: usize,
    direction: WipeDirection,
    offset: usize,
    rng: &mut impl Rng,
) -> Vec<u32> {
    let mut indices = create_initial_indices(length, width, direction);
    for i in 0..length.saturating_sub(1) {
        let window = offset.min(length - 1 - i);
        let j = i + pick_step(rng, window);
        indices.swap(i, j);
    }
    indices
}

/// Uniform draw from [1, max(1, window)].
fn pick_step(rng: &mut impl Rng, window: usize) -> usize {
    rng.gen_range(1..=window.max(1))
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn down_is_ascending_and_up_is_its_reverse() {
        let down = create_initial_indices(5, 4, WipeDirection::Down);
        assert_eq!(down, vec![0, 1, 2, 3, 4]);

        let mut up = create_initial_indices(5, 4, WipeDirection::Up);
        up.reverse();
        assert_eq!(up, down);
    }

    #[test]
    fn right_is_the_transpose_and_left_is_its_reverse() {
        // 0 1 2 3
        // 4 5 6 7
        let right = create_initial_indices(8, 4, WipeDirection::Right);
        assert_eq!(right, vec![0, 4, 1, 5, 2, 6, 3, 7]);

        let mut left = create_initial_indices(8, 4, WipeDirection::Left);
        left.reverse();
        assert_eq!(left, right);
        assert_eq!(
            create_initial_indices(8, 4, WipeDirection::Left),
            vec![7, 3, 6, 2, 5, 1, 4, 0]
        );
    }

    #[test]
    fn transpose_handles_a_tall_grid() {
        let initial: Vec<u32> = (0..15).collect();
        assert_eq!(
            transpose_indices(&initial, 5),
            vec![0, 5, 10, 1, 6, 11, 2, 7, 12, 3, 8, 13, 4, 9, 14]
        );
    }

    #[test]
    fn offset_zero_is_the_one_step_rotation() {
        let mut rng = StdRng::seed_from_u64(7);
        let shuffled = create_shuffled_indices(4, 4, WipeDirection::Down, 0, &mut rng);
        assert_eq!(shuffled, vec![1, 2, 3, 0]);
    }

    #[test]
    fn shuffle_is_a_bounded_permutation() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..20 {
            let shuffled = create_shuffled_indices(10, 5, WipeDirection::Down, 3, &mut rng);

            // Locality: an element can only have drifted backward, so the
            // value at position i is never larger than i + offset.
            for (i, &v) in shuffled.iter().enumerate() {
                assert!(v as usize <= i + 3, "value {v} out of band at {i}");
            }

            let mut sorted = shuffled.clone();
            sorted.sort_unstable();
            let identity: Vec<u32> = (0..10).collect();
            assert_eq!(sorted, identity);
        }
    }

    #[test]
    fn shuffle_of_directional_orders_stays_a_permutation() {
        let mut rng = StdRng::seed_from_u64(9);
        for direction in [
            WipeDirection::Up,
            WipeDirection::Down,
            WipeDirection::Left,
            WipeDirection::Right,
        ] {
            let mut shuffled = create_shuffled_indices(24, 6, direction, 5, &mut rng);
            shuffled.sort_unstable();
            assert_eq!(shuffled, (0..24).collect::<Vec<u32>>());
        }
    }

    #[test]
    fn degenerate_lengths_do_not_panic() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(create_shuffled_indices(0, 4, WipeDirection::Down, 3, &mut rng).is_empty());
        assert_eq!(
            create_shuffled_indices(1, 4, WipeDirection::Down, 3, &mut rng),
            vec![0]
        );
    }

    #[test]
    fn unknown_direction_string_is_rejected() {
        let err = "spiral".parse::<WipeDirection>().unwrap_err();
        assert!(matches!(err, WipeError::InvalidDirection(d) if d == "spiral"));
        assert_eq!("down".parse::<WipeDirection>().unwrap(), WipeDirection::Down);
    }
}
