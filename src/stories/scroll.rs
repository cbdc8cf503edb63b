//! Arrow affordances for the horizontally scrolling story rail.

const EDGE_TOLERANCE_PX: f32 = 1.0;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RailMetrics {
    pub offset: f32,
    pub scroll_width: f32,
    pub client_width: f32,
}

impl RailMetrics {
    pub fn max_offset(&self) -> f32 {
        (self.scroll_width - self.client_width).max(0.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ArrowVisibility {
    pub left: bool,
    pub right: bool,
}

impl ArrowVisibility {
    pub fn from_metrics(metrics: &RailMetrics) -> Self {
        Self {
            left: metrics.offset > EDGE_TOLERANCE_PX,
            right: metrics.offset + metrics.client_width < metrics.scroll_width - EDGE_TOLERANCE_PX,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// Relative scroll the rail should perform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScrollRequest {
    pub delta: f32,
    pub target: f32,
    pub smooth: bool,
}

#[derive(Clone, Debug)]
pub struct ScrollAffordance {
    metrics: RailMetrics,
    arrows: ArrowVisibility,
    step_px: f32,
}

impl ScrollAffordance {
    pub fn new(step_px: f32) -> Self {
        Self {
            metrics: RailMetrics::default(),
            arrows: ArrowVisibility::default(),
            step_px,
        }
    }

    pub fn arrows(&self) -> ArrowVisibility {
        self.arrows
    }

    pub fn metrics(&self) -> RailMetrics {
        self.metrics
    }

    pub fn on_scroll(&mut self, offset: f32) -> ArrowVisibility {
        self.metrics.offset = offset.max(0.0);
        self.recompute()
    }

    pub fn on_resize(&mut self, client_width: f32, scroll_width: f32) -> ArrowVisibility {
        self.metrics.client_width = client_width.max(0.0);
        self.metrics.scroll_width = scroll_width.max(0.0);
        self.metrics.offset = self.metrics.offset.min(self.metrics.max_offset());
        self.recompute()
    }

    pub fn scroll_by(&self, side: Side) -> ScrollRequest {
        let delta = match side {
            Side::Left => -self.step_px,
            Side::Right => self.step_px,
        };
        let target = (self.metrics.offset + delta).clamp(0.0, self.metrics.max_offset());
        ScrollRequest {
            delta,
            target,
            smooth: true,
        }
    }

    fn recompute(&mut self) -> ArrowVisibility {
        self.arrows = ArrowVisibility::from_metrics(&self.metrics);
        self.arrows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrows_follow_the_scroll_offset() {
        let mut rail = ScrollAffordance::new(300.0);
        let arrows = rail.on_resize(400.0, 1_000.0);
        assert_eq!(arrows, ArrowVisibility { left: false, right: true });

        let arrows = rail.on_scroll(250.0);
        assert_eq!(arrows, ArrowVisibility { left: true, right: true });

        let arrows = rail.on_scroll(600.0);
        assert_eq!(arrows, ArrowVisibility { left: true, right: false });
    }

    #[test]
    fn content_narrower_than_viewport_shows_no_arrows() {
        let mut rail = ScrollAffordance::new(300.0);
        assert_eq!(rail.on_resize(800.0, 500.0), ArrowVisibility::default());
    }

    #[test]
    fn widening_the_viewport_hides_the_right_arrow() {
        let mut rail = ScrollAffordance::new(300.0);
        rail.on_resize(400.0, 1_000.0);
        rail.on_scroll(500.0);
        let arrows = rail.on_resize(900.0, 1_000.0);
        assert_eq!(rail.metrics().offset, 100.0);
        assert_eq!(arrows, ArrowVisibility { left: true, right: false });
    }

    #[test]
    fn arrow_clicks_request_a_clamped_smooth_step() {
        let mut rail = ScrollAffordance::new(300.0);
        rail.on_resize(400.0, 1_000.0);
        rail.on_scroll(100.0);

        let left = rail.scroll_by(Side::Left);
        assert_eq!(left.delta, -300.0);
        assert_eq!(left.target, 0.0);
        assert!(left.smooth);

        rail.on_scroll(500.0);
        assert_eq!(rail.scroll_by(Side::Right).target, 600.0);
    }
}
