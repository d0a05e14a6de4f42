//! ffmpeg filter expressions for compiled crop specs.

use reframe_model::{CropFilterSpec, CropRect, KeyPoint};

/// Build the filter chain for `spec`: `crop`, then a scale to even output
/// dimensions for yuv420p.
///
/// Static specs use constant offsets. Dynamic specs evaluate a
/// piecewise-linear `x(t)` over the key points.
pub fn build_crop_filter(spec: &CropFilterSpec) -> String {
    let crop = spec.crop();
    let crop_filter = match spec {
        CropFilterSpec::Static { x, y, .. } => {
            format!("crop=w={}:h={}:x={x}:y={y}", crop.width, crop.height)
        }
        CropFilterSpec::Dynamic { key_points, y, .. } => format!(
            "crop=w={}:h={}:x='{}':y={y}",
            crop.width,
            crop.height,
            build_piecewise_expr(key_points)
        ),
    };
    let (out_w, out_h) = even_output_size(crop);
    format!("{crop_filter},scale={out_w}:{out_h},format=yuv420p")
}

/// Encoded frame size for `crop`: each side rounded down to even, minimum 2.
///
/// 4:2:0 chroma subsampling needs both sides divisible by two.
pub fn even_output_size(crop: CropRect) -> (u32, u32) {
    let even = |v: u32| (v & !1).max(2);
    (even(crop.width), even(crop.height))
}

/// Nested `if(lt(t,T),...)` expression interpolating linearly between key
/// points and holding the first/last value outside their span.
pub fn build_piecewise_expr(key_points: &[KeyPoint]) -> String {
    let mut points: Vec<(f64, f64)> = key_points
        .iter()
        .map(|kp| (kp.time_secs, kp.x as f64))
        .collect();
    if points.is_empty() {
        return "0".to_string();
    }

    points.sort_by(|a, b| a.0.total_cmp(&b.0));

    // Collapse points closer than the expression's time resolution; the
    // earlier time and the later value win.
    let mut sanitized: Vec<(f64, f64)> = Vec::with_capacity(points.len());
    for (t, v) in points {
        if let Some((last_t, last_v)) = sanitized.last_mut() {
            if (t - *last_t).abs() < 1e-4 {
                *last_v = v;
                continue;
            }
        }
        sanitized.push((t, v));
    }
    let points = sanitized;

    let (first_t, first_v) = points[0];
    let (_, last_v) = points[points.len() - 1];
    if points.len() == 1 {
        return format!("{first_v:.3}");
    }

    let mut expr = format!("{last_v:.3}");
    for idx in (0..points.len() - 1).rev() {
        let (t0, v0) = points[idx];
        let (t1, v1) = points[idx + 1];
        let interp = format!(
            "{v0:.3}+({delta:.3})*(t-{t0:.6})/{dur:.6}",
            delta = v1 - v0,
            dur = t1 - t0
        );
        expr = format!("if(lt(t,{t1:.6}),{interp},{expr})");
    }

    if first_t > 0.0 {
        expr = format!("if(lt(t,{first_t:.6}),{first_v:.3},{expr})");
    }
    expr
}

#[cfg(test)]
mod tests {
    use super::*;
    use reframe_model::CropRect;

    const CROP: CropRect = CropRect {
        width: 607,
        height: 1080,
    };

    #[test]
    fn test_static_filter() {
        let spec = CropFilterSpec::Static {
            crop: CROP,
            x: 656,
            y: 0,
        };
        assert_eq!(
            build_crop_filter(&spec),
            "crop=w=607:h=1080:x=656:y=0,scale=606:1080,format=yuv420p"
        );
    }

    #[test]
    fn test_dynamic_filter_quotes_expression() {
        let spec = CropFilterSpec::Dynamic {
            crop: CROP,
            key_points: vec![KeyPoint::new(0.0, 100), KeyPoint::new(2.0, 300)],
            y: 0,
        };
        assert_eq!(
            build_crop_filter(&spec),
            "crop=w=607:h=1080:x='if(lt(t,2.000000),100.000+(200.000)*(t-0.000000)/2.000000,300.000)':y=0,scale=606:1080,format=yuv420p"
        );
    }

    #[test]
    fn test_even_output_size() {
        assert_eq!(even_output_size(CROP), (606, 1080));
        let even = CropRect {
            width: 1080,
            height: 1080,
        };
        assert_eq!(even_output_size(even), (1080, 1080));
        let tiny = CropRect {
            width: 1,
            height: 3,
        };
        assert_eq!(even_output_size(tiny), (2, 2));
    }

    #[test]
    fn test_piecewise_single_and_empty() {
        assert_eq!(build_piecewise_expr(&[]), "0");
        assert_eq!(build_piecewise_expr(&[KeyPoint::new(1.0, 42)]), "42.000");
    }

    #[test]
    fn test_piecewise_nests_segments_in_order() {
        let expr = build_piecewise_expr(&[
            KeyPoint::new(2.0, 30),
            KeyPoint::new(0.0, 10),
            KeyPoint::new(1.0, 20),
        ]);
        assert!(expr.starts_with("if(lt(t,1.000000),10.000+"));
        assert!(expr.contains("if(lt(t,2.000000),20.000+"));
        assert!(expr.ends_with(",30.000))"));
    }

    #[test]
    fn test_piecewise_holds_first_value_before_first_key() {
        let expr = build_piecewise_expr(&[KeyPoint::new(0.5, 10), KeyPoint::new(1.5, 20)]);
        assert!(expr.starts_with("if(lt(t,0.500000),10.000,"));
    }

    #[test]
    fn test_piecewise_collapses_duplicate_times() {
        let expr = build_piecewise_expr(&[
            KeyPoint::new(0.0, 10),
            KeyPoint::new(0.00001, 15),
            KeyPoint::new(1.0, 20),
        ]);
        assert_eq!(expr.matches("if(").count(), 1);
        assert!(expr.contains("15.000+(5.000)"));
    }
}
