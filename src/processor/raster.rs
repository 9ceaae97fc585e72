//! Semantic color-code rasterization.
//!
//! Simulator semantic cameras encode classes as exact RGB triples. Matching
//! is exact equality across all three channels, never a tolerance.

use crate::common::*;

/// Class color of vehicles.
pub const VEHICLE_COLOR: [i64; 3] = [0, 0, 142];
/// Class colors of road surface and lane markings.
pub const ROAD_COLORS: [[i64; 3]; 2] = [[128, 64, 128], [157, 234, 50]];

/// Binary mask of pixels exactly matching `color`, as a `[H, W]` float tensor.
fn color_mask(image: &Tensor, color: [i64; 3]) -> Tensor {
    image
        .select(0, 0)
        .eq(color[0])
        .logical_and(&image.select(0, 1).eq(color[1]))
        .logical_and(&image.select(0, 2).eq(color[2]))
}

/// Convert a top-down semantic image (`[3, H, W]`) into the three-channel
/// occupancy ground truth (`[3, H, W]`: vehicle, road, empty).
///
/// The empty channel is the complement of the vehicle and road channels, so
/// per pixel exactly one channel is set.
pub fn rasterize_topdown(image: &Tensor) -> Tensor {
    let vehicle = color_mask(image, VEHICLE_COLOR);
    let road = color_mask(image, ROAD_COLORS[0]).logical_or(&color_mask(image, ROAD_COLORS[1]));
    let empty = vehicle.logical_or(&road).logical_not();

    Tensor::stack(
        &[
            vehicle.to_kind(Kind::Float),
            road.to_kind(Kind::Float),
            empty.to_kind(Kind::Float),
        ],
        0,
    )
}

/// Convert a front-view semantic image (`[3, H, W]`) into a binary vehicle
/// mask (`[1, H, W]`).
pub fn rasterize_vehicle_mask(image: &Tensor) -> Tensor {
    color_mask(image, VEHICLE_COLOR)
        .to_kind(Kind::Float)
        .unsqueeze(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_image(color: [i64; 3], height: i64, width: i64) -> Tensor {
        let channels: Vec<_> = color
            .iter()
            .map(|&value| Tensor::full(&[height, width], value, FLOAT_CPU))
            .collect();
        Tensor::stack(&channels, 0)
    }

    #[test]
    fn all_vehicle_image_fills_first_channel() {
        let occupancy = rasterize_topdown(&solid_image(VEHICLE_COLOR, 8, 8));
        assert_eq!(occupancy.size(), vec![3, 8, 8]);
        assert_eq!(f64::from(occupancy.i(0).min()), 1.0);
        assert_eq!(f64::from(occupancy.i(1).max()), 0.0);
        assert_eq!(f64::from(occupancy.i(2).max()), 0.0);
    }

    #[test]
    fn both_road_colors_map_to_road() {
        for color in ROAD_COLORS {
            let occupancy = rasterize_topdown(&solid_image(color, 4, 4));
            assert_eq!(f64::from(occupancy.i(1).min()), 1.0);
        }
    }

    #[test]
    fn near_miss_colors_are_not_matched() {
        let occupancy = rasterize_topdown(&solid_image([0, 0, 141], 4, 4));
        assert_eq!(f64::from(occupancy.i(0).max()), 0.0);
        assert_eq!(f64::from(occupancy.i(2).min()), 1.0);
    }

    #[test]
    fn channels_are_exclusive_and_exhaustive() {
        // patchwork of vehicle, road and unknown colors
        let mut columns = Vec::new();
        for color in [VEHICLE_COLOR, ROAD_COLORS[0], ROAD_COLORS[1], [7, 7, 7]] {
            columns.push(solid_image(color, 4, 2));
        }
        let image = Tensor::cat(&columns, 2);

        let occupancy = rasterize_topdown(&image);
        let per_pixel_sum = occupancy.i(0) + occupancy.i(1) + occupancy.i(2);
        assert_eq!(f64::from(per_pixel_sum.min()), 1.0);
        assert_eq!(f64::from(per_pixel_sum.max()), 1.0);
    }

    #[test]
    fn rasterization_is_stable_under_recolorization() {
        let mut columns = Vec::new();
        for color in [VEHICLE_COLOR, ROAD_COLORS[1], [7, 7, 7], ROAD_COLORS[0]] {
            columns.push(solid_image(color, 4, 2));
        }
        let occupancy = rasterize_topdown(&Tensor::cat(&columns, 2));

        // paint each class back with its palette color; empty stays black,
        // which is not a class color
        let recolored = {
            let channels: Vec<_> = (0..3usize)
                .map(|channel| {
                    occupancy.i(0) * VEHICLE_COLOR[channel] as f64
                        + occupancy.i(1) * ROAD_COLORS[0][channel] as f64
                })
                .collect();
            Tensor::stack(&channels, 0)
        };

        let again = rasterize_topdown(&recolored);
        assert_eq!(f64::from((&again - &occupancy).abs().max()), 0.0);
    }

    #[test]
    fn vehicle_mask_matches_vehicle_color_only() {
        let image = Tensor::cat(
            &[
                solid_image(VEHICLE_COLOR, 4, 2),
                solid_image(ROAD_COLORS[0], 4, 2),
            ],
            2,
        );
        let mask = rasterize_vehicle_mask(&image);
        assert_eq!(mask.size(), vec![1, 4, 4]);
        assert_eq!(f64::from(mask.i((0, .., 0..2)).min()), 1.0);
        assert_eq!(f64::from(mask.i((0, .., 2..4)).max()), 0.0);
    }
}
