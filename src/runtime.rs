//! A minimal single-threaded component host.
//!
//! Components are render functions mounted under an optional parent. A component re-renders
//! when one of its own [`Host::use_state`] setters is called, or when an ancestor provides a
//! changed value for a context type the component read. Otherwise parents and children are
//! rendered independently. Renders happen in [`Runtime::mount`] and [`Runtime::update`].
use std::{
    any::{type_name, Any, TypeId},
    cell::RefCell,
    collections::{HashMap, HashSet},
    marker::PhantomData,
    mem::take,
    rc::{Rc, Weak},
};

use derive_ex::derive_ex;
use parse_display::Display;
use slabmap::SlabMap;

use crate::{EffectTiming, Host, LocalSetter, Subscription};


/// Identity of a mounted component.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
#[display("component {0}")]
pub struct ComponentId(usize);

/// Typed handle to a mounted component whose render function returns `R`.
pub struct Component<R> {
    id: ComponentId,
    _phantom: PhantomData<fn() -> R>,
}
impl<R> Clone for Component<R> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<R> Copy for Component<R> {}
impl<R> Component<R> {
    pub fn id(&self) -> ComponentId {
        self.id
    }
}
impl<R> std::fmt::Debug for Component<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&self.id, f)
    }
}

type RenderFn = Box<dyn FnMut(&mut RenderContext) -> Box<dyn Any>>;

struct ComponentData {
    parent: Option<ComponentId>,
    depth: usize,
    render: Option<RenderFn>,
    hooks: Vec<Box<dyn Any>>,
    contexts: HashMap<TypeId, Box<dyn Any>>,
    context_reads: HashSet<TypeId>,
    output: Option<Box<dyn Any>>,
    render_count: usize,
}

struct PendingEffect {
    id: ComponentId,
    index: usize,
    f: Box<dyn FnOnce() -> Subscription>,
}

struct RuntimeData {
    components: RefCell<SlabMap<ComponentData>>,
    dirty: RefCell<Vec<ComponentId>>,
    passive_effects: RefCell<Vec<PendingEffect>>,
}

/// Reactive runtime hosting a tree of components.
#[derive_ex(Default)]
#[default(Self::new())]
pub struct Runtime(Rc<RuntimeData>);

impl Runtime {
    pub fn new() -> Self {
        Self(Rc::new(RuntimeData {
            components: RefCell::new(SlabMap::new()),
            dirty: RefCell::new(Vec::new()),
            passive_effects: RefCell::new(Vec::new()),
        }))
    }

    /// Mounts a component under `parent`, renders it and commits its effects.
    pub fn mount<R: 'static>(
        &mut self,
        parent: Option<ComponentId>,
        mut render: impl FnMut(&mut RenderContext) -> R + 'static,
    ) -> Component<R> {
        let depth = match parent {
            Some(p) => self.with_component(p, |c| c.depth + 1),
            None => 0,
        };
        let key = self.0.components.borrow_mut().insert(ComponentData {
            parent,
            depth,
            render: Some(Box::new(move |cx: &mut RenderContext| -> Box<dyn Any> {
                Box::new(render(cx))
            })),
            hooks: Vec::new(),
            contexts: HashMap::new(),
            context_reads: HashSet::new(),
            output: None,
            render_count: 0,
        });
        let id = ComponentId(key);
        self.render(id);
        self.update();
        Component {
            id,
            _phantom: PhantomData,
        }
    }

    /// Unmounts a component and all of its descendants, dropping their hooks.
    ///
    /// Effect cleanups run as part of the drop, descendants first.
    pub fn unmount(&mut self, id: ComponentId) {
        let children: Vec<ComponentId> = self
            .0
            .components
            .borrow()
            .iter()
            .filter(|(_, c)| c.parent == Some(id))
            .map(|(key, _)| ComponentId(key))
            .collect();
        for child in children {
            self.unmount(child);
        }
        self.0.dirty.borrow_mut().retain(|d| *d != id);
        self.0.passive_effects.borrow_mut().retain(|e| e.id != id);
        let data = self.0.components.borrow_mut().remove(id.0);
        drop(data);
    }

    pub fn is_mounted(&self, id: ComponentId) -> bool {
        self.0.components.borrow().get(id.0).is_some()
    }

    /// Re-renders components whose state changed and runs pending effects until nothing is left.
    pub fn update(&mut self) {
        loop {
            let mut dirty = take(&mut *self.0.dirty.borrow_mut());
            if !dirty.is_empty() {
                dirty.sort_by_key(|id| (self.depth(*id), id.0));
                dirty.dedup();
                for id in dirty {
                    if self.is_mounted(id) {
                        self.render(id);
                    }
                }
                continue;
            }
            let effects = take(&mut *self.0.passive_effects.borrow_mut());
            if effects.is_empty() {
                break;
            }
            for e in effects {
                self.run_effect(e);
            }
        }
    }

    /// Latest value returned by the component's render function.
    pub fn output<R: Clone + 'static>(&self, component: &Component<R>) -> R {
        self.with_component(component.id, |c| {
            match c.output.as_ref().and_then(|o| o.downcast_ref::<R>()) {
                Some(output) => output.clone(),
                None => panic!("{} has not rendered.", component.id),
            }
        })
    }

    pub fn render_count(&self, id: ComponentId) -> usize {
        self.with_component(id, |c| c.render_count)
    }

    fn with_component<T>(&self, id: ComponentId, f: impl FnOnce(&ComponentData) -> T) -> T {
        match self.0.components.borrow().get(id.0) {
            Some(c) => f(c),
            None => panic!("{id} is not mounted."),
        }
    }
    fn depth(&self, id: ComponentId) -> usize {
        self.0
            .components
            .borrow()
            .get(id.0)
            .map_or(usize::MAX, |c| c.depth)
    }

    fn render(&mut self, id: ComponentId) {
        let (mut render, hooks, prev_contexts) = {
            let mut components = self.0.components.borrow_mut();
            let c = mounted(&mut components, id);
            let Some(render) = c.render.take() else {
                panic!("{id} is already rendering.");
            };
            (render, take(&mut c.hooks), take(&mut c.contexts))
        };
        let mut cx = RenderContext {
            rt: self.0.clone(),
            id,
            is_first: hooks.is_empty(),
            hooks,
            cursor: 0,
            prev_contexts,
            contexts: HashMap::new(),
            changed_contexts: Vec::new(),
            context_reads: HashSet::new(),
            layout_effects: Vec::new(),
        };
        let output = render(&mut cx);
        let RenderContext {
            hooks,
            contexts,
            changed_contexts,
            context_reads,
            layout_effects,
            ..
        } = cx;
        {
            let mut components = self.0.components.borrow_mut();
            let c = mounted(&mut components, id);
            c.render = Some(render);
            c.hooks = hooks;
            c.contexts = contexts;
            c.context_reads = context_reads;
            c.output = Some(output);
            c.render_count += 1;
        }
        self.mark_context_readers(id, &changed_contexts);
        for e in layout_effects {
            self.run_effect(e);
        }
    }

    /// Marks the descendants of `id` that read one of `changed` as dirty.
    fn mark_context_readers(&self, id: ComponentId, changed: &[TypeId]) {
        if changed.is_empty() {
            return;
        }
        let components = self.0.components.borrow();
        for (key, c) in components.iter() {
            let reads = changed.iter().any(|t| c.context_reads.contains(t));
            if reads && is_descendant(&components, c, id) {
                self.0.mark_dirty(ComponentId(key));
            }
        }
    }

    fn run_effect(&mut self, e: PendingEffect) {
        let old = self.effect_hook(e.id, e.index, |h| h.cleanup.take());
        drop(old);
        let cleanup = (e.f)();
        let old = self.effect_hook(e.id, e.index, |h| h.cleanup.replace(cleanup));
        drop(old);
    }
    fn effect_hook<T>(
        &self,
        id: ComponentId,
        index: usize,
        f: impl FnOnce(&mut EffectHook) -> T,
    ) -> Option<T> {
        let mut components = self.0.components.borrow_mut();
        let hook = components.get_mut(id.0)?.hooks.get_mut(index)?;
        hook.downcast_mut::<EffectHook>().map(f)
    }
}

fn mounted(components: &mut SlabMap<ComponentData>, id: ComponentId) -> &mut ComponentData {
    match components.get_mut(id.0) {
        Some(c) => c,
        None => panic!("{id} is not mounted."),
    }
}

fn is_descendant(
    components: &SlabMap<ComponentData>,
    c: &ComponentData,
    ancestor: ComponentId,
) -> bool {
    let mut parent = c.parent;
    while let Some(id) = parent {
        if id == ancestor {
            return true;
        }
        parent = components.get(id.0).and_then(|c| c.parent);
    }
    false
}

impl RuntimeData {
    fn mark_dirty(&self, id: ComponentId) {
        self.dirty.borrow_mut().push(id);
    }
}

struct StateHook<T>(Rc<RefCell<T>>);

struct MemoHook<T, D> {
    deps: Option<D>,
    value: Option<T>,
}

struct EffectHook {
    deps: Option<Box<dyn Any>>,
    cleanup: Option<Subscription>,
}

/// The [`Host`] handed to a component's render function.
pub struct RenderContext {
    rt: Rc<RuntimeData>,
    id: ComponentId,
    is_first: bool,
    hooks: Vec<Box<dyn Any>>,
    cursor: usize,
    prev_contexts: HashMap<TypeId, Box<dyn Any>>,
    contexts: HashMap<TypeId, Box<dyn Any>>,
    changed_contexts: Vec<TypeId>,
    context_reads: HashSet<TypeId>,
    layout_effects: Vec<PendingEffect>,
}

impl RenderContext {
    pub fn id(&self) -> ComponentId {
        self.id
    }

    fn hook<H: 'static>(&mut self, init: impl FnOnce() -> H) -> (usize, &mut H) {
        let index = self.cursor;
        self.cursor += 1;
        if index == self.hooks.len() {
            if !self.is_first {
                panic!("{} called more hooks than on its first render.", self.id);
            }
            self.hooks.push(Box::new(init()));
        }
        match self.hooks[index].downcast_mut::<H>() {
            Some(h) => (index, h),
            None => panic!(
                "hook {index} of {} is not `{}`; hooks must be called in the same order on every render.",
                self.id,
                type_name::<H>()
            ),
        }
    }
}

impl Host for RenderContext {
    fn use_context<C: Clone + 'static>(&mut self) -> Option<C> {
        let key = TypeId::of::<C>();
        self.context_reads.insert(key);
        if let Some(value) = self.contexts.get(&key) {
            return value.downcast_ref::<C>().cloned();
        }
        let components = self.rt.components.borrow();
        let mut parent = components.get(self.id.0).and_then(|c| c.parent);
        while let Some(id) = parent {
            let c = components.get(id.0)?;
            if let Some(value) = c.contexts.get(&key) {
                return value.downcast_ref::<C>().cloned();
            }
            parent = c.parent;
        }
        None
    }

    fn provide_context<C: Clone + PartialEq + 'static>(&mut self, value: C) {
        let key = TypeId::of::<C>();
        let changed = self
            .prev_contexts
            .get(&key)
            .is_some_and(|prev| prev.downcast_ref::<C>() != Some(&value));
        if changed {
            self.changed_contexts.push(key);
        }
        self.contexts.insert(key, Box::new(value));
    }

    fn use_state<T: Clone + 'static>(&mut self, init: impl FnOnce() -> T) -> (T, LocalSetter<T>) {
        let (_, hook) = self.hook(|| StateHook(Rc::new(RefCell::new(init()))));
        let value = hook.0.borrow().clone();
        let slot = Rc::downgrade(&hook.0);
        let rt: Weak<RuntimeData> = Rc::downgrade(&self.rt);
        let id = self.id;
        let setter = LocalSetter::new(move |value| {
            if let (Some(slot), Some(rt)) = (slot.upgrade(), rt.upgrade()) {
                *slot.borrow_mut() = value;
                rt.mark_dirty(id);
            }
        });
        (value, setter)
    }

    fn use_memo<T: Clone + 'static, D: PartialEq + 'static>(
        &mut self,
        deps: D,
        f: impl FnOnce() -> T,
    ) -> T {
        let (_, hook) = self.hook(|| MemoHook::<T, D> {
            deps: None,
            value: None,
        });
        if let (Some(value), Some(old)) = (&hook.value, &hook.deps) {
            if *old == deps {
                return value.clone();
            }
        }
        let value = f();
        hook.value = Some(value.clone());
        hook.deps = Some(deps);
        value
    }

    fn use_effect<D: PartialEq + 'static>(
        &mut self,
        timing: EffectTiming,
        deps: D,
        f: impl FnOnce() -> Subscription + 'static,
    ) {
        let (index, hook) = self.hook(|| EffectHook {
            deps: None,
            cleanup: None,
        });
        if hook.deps.as_ref().and_then(|d| d.downcast_ref::<D>()) == Some(&deps) {
            return;
        }
        hook.deps = Some(Box::new(deps));
        let e = PendingEffect {
            id: self.id,
            index,
            f: Box::new(f),
        };
        match timing {
            EffectTiming::Layout => self.layout_effects.push(e),
            EffectTiming::Passive => self.rt.passive_effects.borrow_mut().push(e),
        }
    }
}
