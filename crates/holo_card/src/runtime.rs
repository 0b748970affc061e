//! Card runtime
//!
//! The shared services every card on a page uses, constructed once with
//! the host's frame clock and orientation sensor. The host forwards its
//! events through [`CardRuntime::dispatch`] or calls the service methods
//! directly.

use crate::config::CardConfig;
use crate::controller::CardController;
use crate::navigation::Navigation;
use crate::orientation::OrientationSource;
use holo_animation::{AnimationScheduler, SchedulerHandle, TaskQueue, VisibilityObserver};
use holo_platform::{
    Event, FrameHost, OrientationSensor, PreferenceEvent, SurfaceId, VisibilityEvent,
};
use rustc_hash::FxHashMap;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

/// Shared services for all mounted cards
pub struct CardRuntime {
    config: CardConfig,
    host: Rc<dyn FrameHost>,
    scheduler: AnimationScheduler,
    orientation: OrientationSource,
    visibility: VisibilityObserver,
    tasks: TaskQueue,
    reduced_motion: Cell<bool>,
    controllers: RefCell<FxHashMap<SurfaceId, Weak<CardController>>>,
}

impl CardRuntime {
    pub fn new(
        config: CardConfig,
        host: Rc<dyn FrameHost>,
        sensor: Rc<dyn OrientationSensor>,
    ) -> Self {
        Self {
            config,
            scheduler: AnimationScheduler::new(Rc::clone(&host)),
            orientation: OrientationSource::new(sensor, Rc::clone(&host)),
            visibility: VisibilityObserver::new(),
            tasks: TaskQueue::new(Rc::clone(&host)),
            host,
            reduced_motion: Cell::new(false),
            controllers: RefCell::new(FxHashMap::default()),
        }
    }

    pub fn config(&self) -> &CardConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &AnimationScheduler {
        &self.scheduler
    }

    pub fn scheduler_handle(&self) -> SchedulerHandle {
        self.scheduler.handle()
    }

    pub fn orientation(&self) -> &OrientationSource {
        &self.orientation
    }

    pub fn visibility(&self) -> &VisibilityObserver {
        &self.visibility
    }

    pub fn tasks(&self) -> &TaskQueue {
        &self.tasks
    }

    pub fn now_ms(&self) -> f64 {
        self.host.now_ms()
    }

    /// Current reduced-motion preference
    pub fn reduced_motion(&self) -> bool {
        self.reduced_motion.get()
    }

    /// Track a mounted controller so events can be routed to it
    pub(crate) fn register(&self, surface: SurfaceId, controller: &Rc<CardController>) {
        self.controllers
            .borrow_mut()
            .insert(surface, Rc::downgrade(controller));
    }

    pub(crate) fn unregister(&self, surface: SurfaceId) {
        self.controllers.borrow_mut().remove(&surface);
    }

    fn controller(&self, surface: SurfaceId) -> Option<Rc<CardController>> {
        self.controllers
            .borrow()
            .get(&surface)
            .and_then(Weak::upgrade)
    }

    fn all_controllers(&self) -> Vec<Rc<CardController>> {
        self.controllers
            .borrow()
            .values()
            .filter_map(Weak::upgrade)
            .collect()
    }

    /// Run due delayed tasks
    pub fn run_due_tasks(&self) -> usize {
        self.tasks.run_due()
    }

    /// Service a frame: due tasks first, then the scheduler tick
    pub fn frame(&self) -> bool {
        self.tasks.run_due();
        self.scheduler.tick()
    }

    /// Change the reduced-motion preference for every card
    pub fn set_reduced_motion(&self, reduced: bool) {
        if self.reduced_motion.replace(reduced) == reduced {
            return;
        }
        tracing::debug!(reduced, "reduced motion preference changed");
        for controller in self.all_controllers() {
            controller.set_reduced_motion(reduced);
        }
    }

    /// Route one host event
    ///
    /// Returns the navigation an input activated, if any.
    pub fn dispatch(&self, event: &Event) -> Option<Navigation> {
        match event {
            Event::Input { surface, event } => {
                let controller = self.controller(*surface)?;
                controller.handle_input(event)
            }
            Event::Orientation(sample) => {
                self.orientation.handle_sample(sample);
                None
            }
            Event::Visibility(VisibilityEvent::Document { visible }) => {
                // Pause channels before the controllers retarget them
                self.scheduler.set_page_visible(*visible);
                self.visibility.set_document_visible(*visible);
                None
            }
            Event::Visibility(VisibilityEvent::Surface {
                surface,
                intersecting,
            }) => {
                self.visibility.set_intersecting(*surface, *intersecting);
                None
            }
            Event::Preference(PreferenceEvent::ReducedMotion(reduced)) => {
                self.set_reduced_motion(*reduced);
                None
            }
            Event::Frame => {
                self.frame();
                None
            }
        }
    }
}
