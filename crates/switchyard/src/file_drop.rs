//! The file drop target.
//!
//! A small borderless square that appears on demand. Files dropped on it
//! are handed to [`AppActions::open_files`] and the target hides again.

use std::rc::Rc;
use std::time::Duration;

use switchyard_core::target::{styles, MixBehavior, TargetConfig};
use switchyard_core::{
    anchor, codes, impl_composite, LResult, Message, MethodRegistry, Reactor, RgbColor, TargetFactory,
};

use crate::actions::AppActions;
use crate::components::{Borderless, Hideable, Mounted};
use crate::error::AppResult;

/// Side length of the target.
pub const SIDE: i32 = 200;

/// Below this side length the icon is not drawn.
const MIN_ICON_SIDE: i32 = 30;

/// Fill color of the target.
pub const BACKGROUND: RgbColor = RgbColor::new(60, 60, 60);

/// Stroke color of the icon.
pub const PEN: RgbColor = RgbColor::new(210, 210, 210);

/// A point in target coordinates.
pub type Point = (i32, i32);

/// What one `PAINT` produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Fill color.
    pub background: RgbColor,
    /// Stroke color.
    pub pen: RgbColor,
    /// Connected polylines of the document icon.
    pub strokes: Vec<Vec<Point>>,
}

impl Frame {
    /// Lay out a frame for a `width` × `height` surface.
    ///
    /// The icon is a document with a folded corner and three text lines,
    /// scaled to a tenth of the smaller side and centered.
    pub fn layout(width: i32, height: i32) -> Self {
        Self {
            background: BACKGROUND,
            pen: PEN,
            strokes: icon_strokes(width, height),
        }
    }
}

fn icon_strokes(width: i32, height: i32) -> Vec<Vec<Point>> {
    let smallest = width.min(height);
    if smallest < MIN_ICON_SIDE {
        return Vec::new();
    }
    let dp = smallest / 10;
    let (cx, cy) = (width / 2, height / 2);
    let at = |x: i32, y: i32| (cx + x * dp, cy + y * dp);

    vec![
        // Outline with the folded corner cut out.
        vec![at(-3, -4), at(1, -4), at(1, -2), at(3, -2), at(3, 4), at(-3, 4), at(-3, -4)],
        // Fold.
        vec![at(1, -4), at(3, -2)],
        // Text lines.
        vec![at(-2, -1), at(2, -1)],
        vec![at(-2, 0), at(2, 0)],
        vec![at(-2, 1), at(0, 1)],
    ]
}

/// The file drop composite.
pub struct FileDrop {
    frame: Borderless,
    hideable: Hideable,
    actions: Rc<dyn AppActions>,
    size: (i32, i32),
    last_frame: Option<Frame>,
    opened: usize,
    bindings: MethodRegistry,
}

impl_composite!(FileDrop, registry: bindings, components: [frame: Borderless, hideable: Hideable]);

impl FileDrop {
    /// Create the target, hidden, and anchor the composite.
    pub fn create(
        factory: &Rc<dyn TargetFactory>,
        reactor: &mut Reactor,
        actions: Rc<dyn AppActions>,
    ) -> AppResult<Mounted<Self>> {
        let mut file_drop = Self {
            frame: Borderless,
            hideable: Hideable::new(false),
            actions,
            size: (SIDE, SIDE),
            last_frame: None,
            opened: 0,
            bindings: MethodRegistry::new(),
        };

        let config = TargetConfig::new()
            .ex_style(styles::WS_EX_TOOLWINDOW | styles::WS_EX_ACCEPTFILES, MixBehavior::Combine)
            .size(SIDE, SIDE, MixBehavior::Rewrite);
        let config = Borderless::configure(&mut file_drop.bindings, config)?;
        let config = file_drop.hideable.configure(&mut file_drop.bindings, config)?;
        let config = config
            .handler(
                codes::DROP_FILES,
                file_drop.bindings.request_method_callback(Self::on_drop_files)?,
                MixBehavior::Combine,
            )
            .handler(
                codes::PAINT,
                file_drop.bindings.request_method_callback(Self::on_paint)?,
                MixBehavior::Combine,
            );

        let target = config.create(factory, reactor)?;
        file_drop.hideable.attach(target.link());
        Ok(Mounted {
            composite: anchor(file_drop)?,
            target,
        })
    }

    /// Whether the target is meant to be shown.
    pub fn is_shown(&self) -> bool {
        self.hideable.is_shown()
    }

    /// Show the target for a while.
    pub fn show_for(&mut self, duration: Duration) {
        self.hideable.show_for(duration);
    }

    /// Hide the target.
    pub fn hide(&mut self) {
        self.hideable.show(false);
    }

    /// The most recently painted frame.
    pub fn last_frame(&self) -> Option<&Frame> {
        self.last_frame.as_ref()
    }

    /// How many drops were handed to the editor successfully.
    pub fn opened(&self) -> usize {
        self.opened
    }

    fn on_drop_files(&mut self, message: &Message) -> LResult {
        self.hideable.show(false);
        let files = message.files();
        match self.actions.open_files(files) {
            Ok(()) => {
                self.opened += 1;
                tracing::debug!(target: "switchyard::app", count = files.len(), "dropped files opened");
            }
            Err(err) => {
                tracing::warn!(target: "switchyard::app", error = %err, "failed to open dropped files");
            }
        }
        0
    }

    fn on_paint(&mut self, _message: &Message) -> LResult {
        let (width, height) = self.size;
        self.last_frame = Some(Frame::layout(width, height));
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_icon_is_centered_and_scaled() {
        let frame = Frame::layout(SIDE, SIDE);
        assert_eq!(frame.strokes.len(), 5);
        assert_eq!(
            frame.strokes.iter().map(Vec::len).collect::<Vec<_>>(),
            [7, 2, 2, 2, 2]
        );
        // dp = 20, center = (100, 100).
        assert_eq!(frame.strokes[0][0], (40, 20));
        assert_eq!(frame.strokes[0][4], (160, 180));
        assert_eq!(frame.strokes[4], vec![(60, 120), (100, 120)]);
    }

    #[test]
    fn test_outline_is_closed() {
        let outline = &Frame::layout(120, 90).strokes[0];
        assert_eq!(outline.first(), outline.last());
    }

    #[test]
    fn test_small_surface_has_no_icon() {
        assert!(Frame::layout(29, 200).strokes.is_empty());
        assert!(!Frame::layout(30, 30).strokes.is_empty());
        assert_eq!(Frame::layout(10, 10).background, BACKGROUND);
    }
}
