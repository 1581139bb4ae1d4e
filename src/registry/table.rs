use std::cell::RefCell;
use std::rc::{Rc, Weak};

use glam::Vec3;

use super::dispatcher::{DrawOrder, FrameDispatcher};
use crate::drawable::Drawable;
use crate::error::SceneError;
use crate::signal::{Connection, Signal};
use crate::transform::{to_internal, SharedPose};

/// Index of an element inside one [`Registry`].
///
/// Handles grow monotonically from 0 and are never reused until
/// [`Registry::purge`] empties the table.
pub type Handle = usize;

struct Record<D> {
    /// `None` once the element is deleted; the slot stays as a tombstone.
    resource: Option<D>,
    name: String,
    visible: bool,
    subscription: Option<Connection>,
}

struct Table<D: Drawable> {
    records: Vec<Record<D>>,
    context: D::Context,
}

impl<D: Drawable> Table<D> {
    fn live(&mut self, handle: Handle) -> Option<&mut Record<D>> {
        let record = self
            .records
            .get_mut(handle)
            .filter(|record| record.resource.is_some());
        if record.is_none() {
            log::debug!("{}: no live element at handle {handle}", D::KIND);
        }
        record
    }

    fn with_resource(&mut self, handle: Handle, f: impl FnOnce(&mut D)) -> bool {
        match self.live(handle).and_then(|record| record.resource.as_mut()) {
            Some(resource) => {
                f(resource);
                true
            }
            None => false,
        }
    }

    fn run(
        &mut self,
        handle: Handle,
        step: impl FnOnce(&mut D) -> Result<(), SceneError>,
    ) -> bool {
        let Some(record) = self.live(handle) else {
            return false;
        };
        if !record.visible {
            return false;
        }
        let Some(resource) = record.resource.as_mut() else {
            return false;
        };
        match step(resource) {
            Ok(()) => true,
            Err(error) => {
                log::debug!("{} {handle} ('{}'): {error}", D::KIND, record.name);
                false
            }
        }
    }

    /// Best-effort pass over every live, visible element. Returns how many
    /// succeeded.
    fn run_all(
        &mut self,
        pass: &str,
        mut step: impl FnMut(&mut D) -> Result<(), SceneError>,
    ) -> usize {
        let mut succeeded = 0;
        for (handle, record) in self.records.iter_mut().enumerate() {
            if !record.visible {
                continue;
            }
            let Some(resource) = record.resource.as_mut() else {
                continue;
            };
            match step(resource) {
                Ok(()) => succeeded += 1,
                Err(SceneError::EmptyInput) => {
                    log::debug!("{} {handle} ('{}'): nothing to {pass}", D::KIND, record.name);
                }
                Err(error) => {
                    log::warn!("{} {handle} ('{}'): {pass} failed: {error}", D::KIND, record.name);
                }
            }
        }
        succeeded
    }

    fn update_all(&mut self) -> usize {
        self.run_all("update", D::update)
    }

    fn draw_all(&mut self) -> usize {
        self.run_all("draw", D::draw)
    }
}

/// Append-only table of drawables of one kind.
///
/// Every element is addressed by the [`Handle`] returned from
/// [`Registry::add`]. Mutators on an unknown or deleted handle return
/// `false` instead of failing. Bulk passes skip invisible and deleted
/// elements and carry on past individual failures.
///
/// The table is shared with the closures the registry subscribes to
/// external signals; those hold only a weak reference, so dropping the
/// registry ends every subscription's effect.
pub struct Registry<D: Drawable> {
    table: Rc<RefCell<Table<D>>>,
    update_subscription: Option<Connection>,
    draw_subscription: Option<Connection>,
}

impl<D: Drawable> Registry<D> {
    /// Empty registry building its elements from `context`.
    #[must_use]
    pub fn new(context: D::Context) -> Self {
        Self {
            table: Rc::new(RefCell::new(Table {
                records: Vec::new(),
                context,
            })),
            update_subscription: None,
            draw_subscription: None,
        }
    }

    /// Build an element from `input` and append it. The element follows
    /// `primary` (identity when `None`). Always succeeds.
    pub fn add(
        &mut self,
        input: D::Input,
        name: impl Into<String>,
        primary: Option<SharedPose>,
        visible: bool,
    ) -> Handle {
        let mut table = self.table.borrow_mut();
        let mut resource = D::build(&table.context, input);
        resource.transform_mut().set_primary(primary);
        table.records.push(Record {
            resource: Some(resource),
            name: name.into(),
            visible,
            subscription: None,
        });
        table.records.len() - 1
    }

    /// Replace an element's data; it is re-uploaded on its next update.
    pub fn change_input(&mut self, handle: Handle, input: D::Input) -> bool {
        self.table
            .borrow_mut()
            .with_resource(handle, |resource| resource.change_input(input))
    }

    /// Show or hide an element. Hidden elements are skipped by update and
    /// draw.
    pub fn set_visibility(&mut self, handle: Handle, visible: bool) -> bool {
        match self.table.borrow_mut().live(handle) {
            Some(record) => {
                record.visible = visible;
                true
            }
            None => false,
        }
    }

    /// Make an element follow another pose (identity when `None`).
    pub fn set_transformation_matrix(
        &mut self,
        handle: Handle,
        primary: Option<SharedPose>,
    ) -> bool {
        self.modify(handle, |resource| resource.transform_mut().set_primary(primary))
    }

    /// Translate an element locally; `(x, y, z)` in vehicle axes.
    pub fn translate(&mut self, handle: Handle, x: f32, y: f32, z: f32) -> bool {
        let offset = to_internal(Vec3::new(x, y, z));
        self.modify(handle, |resource| resource.transform_mut().translate(offset))
    }

    /// Rotate an element locally by vehicle-axis pitch, yaw and roll.
    pub fn rotate(&mut self, handle: Handle, pitch: f32, yaw: f32, roll: f32) -> bool {
        self.modify(handle, |resource| {
            resource.transform_mut().rotate(-pitch, yaw, -roll);
        })
    }

    /// Rotate about the vehicle x axis (internal -z).
    pub fn rotate_in_x(&mut self, handle: Handle, angle: f32) -> bool {
        self.modify(handle, |resource| resource.transform_mut().rotate_z(-angle))
    }

    /// Rotate about the vehicle y axis (internal -x).
    pub fn rotate_in_y(&mut self, handle: Handle, angle: f32) -> bool {
        self.modify(handle, |resource| resource.transform_mut().rotate_x(-angle))
    }

    /// Rotate about the vehicle z axis (internal y).
    pub fn rotate_in_z(&mut self, handle: Handle, angle: f32) -> bool {
        self.modify(handle, |resource| resource.transform_mut().rotate_y(angle))
    }

    /// Run `f` on a live element. Used for kind-specific settings such as
    /// point size or line type.
    pub fn modify(&mut self, handle: Handle, f: impl FnOnce(&mut D)) -> bool {
        self.table.borrow_mut().with_resource(handle, f)
    }

    /// Upload one element's pending data. `false` when the handle is
    /// unknown, the element is hidden, or the upload failed.
    pub fn update(&mut self, handle: Handle) -> bool {
        self.table.borrow_mut().run(handle, D::update)
    }

    /// Draw one element. `false` when the handle is unknown, the element is
    /// hidden, or the draw failed.
    pub fn draw(&mut self, handle: Handle) -> bool {
        self.table.borrow_mut().run(handle, D::draw)
    }

    /// Update every live, visible element. Returns how many succeeded.
    pub fn update_all(&mut self) -> usize {
        self.table.borrow_mut().update_all()
    }

    /// Draw every live, visible element. Returns how many succeeded.
    pub fn draw_all(&mut self) -> usize {
        self.table.borrow_mut().draw_all()
    }

    /// Destroy an element and leave its slot as a tombstone. `false` when it
    /// was already gone.
    pub fn delete_element(&mut self, handle: Handle) -> bool {
        let removed = {
            let mut table = self.table.borrow_mut();
            match table.live(handle) {
                Some(record) => {
                    let subscription = record.subscription.take();
                    Some((record.resource.take(), subscription))
                }
                None => None,
            }
        };
        // Dropped outside the borrow: a resource or token may touch signals
        // that call back into this registry.
        removed.is_some()
    }

    /// Destroy every element, end every per-element subscription and reset
    /// the table. Every handle issued so far becomes invalid; the next
    /// [`Registry::add`] returns 0.
    pub fn purge(&mut self) {
        let records = std::mem::take(&mut self.table.borrow_mut().records);
        log::debug!("{}: purged {} slots", D::KIND, records.len());
        drop(records);
    }

    /// Update `handle` whenever `event` fires, replacing any earlier
    /// subscription for that element.
    pub fn connect<T: 'static>(&mut self, handle: Handle, event: &Signal<T>) -> bool {
        let previous = {
            let mut table = self.table.borrow_mut();
            let Some(record) = table.live(handle) else {
                return false;
            };
            record.subscription.take()
        };
        drop(previous);

        let weak = Rc::downgrade(&self.table);
        let connection = event.connect(move |_| {
            with_table(&weak, |table| {
                let _ = table.run(handle, D::update);
            });
        });
        match self.table.borrow_mut().live(handle) {
            Some(record) => {
                record.subscription = Some(connection);
                true
            }
            None => false,
        }
    }

    /// Run [`Registry::update_all`] whenever `event` fires, replacing any
    /// earlier bulk subscription.
    pub fn connect_all<T: 'static>(&mut self, event: &Signal<T>) {
        self.update_subscription = None;
        let weak = Rc::downgrade(&self.table);
        self.update_subscription = Some(event.connect(move |_| {
            with_table(&weak, |table| {
                let _ = table.update_all();
            });
        }));
    }

    /// Draw every element at `order` in each frame the dispatcher runs,
    /// replacing any earlier draw subscription.
    pub fn synchronize(&mut self, dispatcher: &FrameDispatcher, order: DrawOrder) {
        self.draw_subscription = None;
        let weak = Rc::downgrade(&self.table);
        self.draw_subscription = Some(dispatcher.synchronize(order, move |_| {
            with_table(&weak, |table| {
                let _ = table.draw_all();
            });
        }));
    }

    /// End the bulk update and draw subscriptions.
    pub fn disconnect_all(&mut self) {
        self.update_subscription = None;
        self.draw_subscription = None;
    }

    /// Whether the bulk update is subscribed to an event.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.update_subscription
            .as_ref()
            .is_some_and(Connection::is_connected)
    }

    /// Whether the element at `handle` has its own update subscription.
    #[must_use]
    pub fn is_element_connected(&self, handle: Handle) -> bool {
        self.table
            .borrow()
            .records
            .get(handle)
            .and_then(|record| record.subscription.as_ref())
            .is_some_and(Connection::is_connected)
    }

    /// Number of slots, tombstones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.borrow().records.len()
    }

    /// Whether no element was added since creation or the last purge.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of elements not deleted.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.table
            .borrow()
            .records
            .iter()
            .filter(|record| record.resource.is_some())
            .count()
    }

    /// Whether `handle` refers to a live element.
    #[must_use]
    pub fn contains(&self, handle: Handle) -> bool {
        self.table
            .borrow()
            .records
            .get(handle)
            .is_some_and(|record| record.resource.is_some())
    }

    /// Name given to a live element.
    #[must_use]
    pub fn name(&self, handle: Handle) -> Option<String> {
        let table = self.table.borrow();
        let record = table.records.get(handle)?;
        record.resource.as_ref().map(|_| record.name.clone())
    }

    /// Visibility of a live element.
    #[must_use]
    pub fn is_visible(&self, handle: Handle) -> Option<bool> {
        let table = self.table.borrow();
        let record = table.records.get(handle)?;
        record.resource.as_ref().map(|_| record.visible)
    }
}

fn with_table<D: Drawable>(weak: &Weak<RefCell<Table<D>>>, f: impl FnOnce(&mut Table<D>)) {
    let Some(table) = weak.upgrade() else {
        return;
    };
    // A subscriber fired from inside one of this registry's own passes
    // finds the table borrowed; skip rather than alias it.
    match table.try_borrow_mut() {
        Ok(mut table) => f(&mut table),
        Err(_) => log::warn!("{}: table busy, skipped re-entrant pass", D::KIND),
    };
}
