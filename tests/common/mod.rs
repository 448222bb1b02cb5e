use std::cell::RefCell;
use std::rc::Rc;

use delegation_graph::components::round_graph::{DisplaySurface, Scene, Size, ViewTransform};

#[derive(Debug, Default)]
pub struct Log {
	pub extent: Size,
	pub attached: usize,
	pub attaches: usize,
	pub observers: usize,
	pub frames: usize,
	pub transform: Option<ViewTransform>,
	pub labels: Vec<String>,
	pub placeholders: Vec<bool>,
}

/// Surface that counts lifecycle calls instead of drawing.
pub struct FakeSurface {
	pub log: Rc<RefCell<Log>>,
}

pub fn surface(width: f64, height: f64) -> (FakeSurface, Rc<RefCell<Log>>) {
	let log = Rc::new(RefCell::new(Log {
		extent: Size::new(width, height),
		..Log::default()
	}));
	(FakeSurface { log: log.clone() }, log)
}

impl DisplaySurface for FakeSurface {
	fn attach(&mut self) {
		let mut log = self.log.borrow_mut();
		log.attached += 1;
		log.attaches += 1;
	}

	fn detach(&mut self) {
		self.log.borrow_mut().attached -= 1;
	}

	fn measure(&mut self) -> Size {
		self.log.borrow().extent
	}

	fn observe_resize(&mut self) {
		self.log.borrow_mut().observers += 1;
	}

	fn unobserve_resize(&mut self) {
		self.log.borrow_mut().observers -= 1;
	}

	fn present(&mut self, scene: &Scene<'_>) {
		let mut log = self.log.borrow_mut();
		log.frames += 1;
		log.transform = Some(scene.transform);
		log.labels = scene.nodes.iter().map(|n| n.node.label.clone()).collect();
		log.placeholders = scene.nodes.iter().map(|n| n.node.is_placeholder).collect();
	}
}
