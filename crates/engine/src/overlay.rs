use std::cell::RefCell;
use std::rc::Rc;
use voxel_ecs::{Entity, EntityBehavior, GlobalSubscriber, Shared, attach, spawn, subscribe};
use voxel_input::{InputCapturer, InputListenerComponent, InputPriority, Key};
use voxel_kernel::{MessageBus, UpdateMessage};
use voxel_render::{GuiDepth, GuiRender};

const TYPED_KEYS: [(Key, char); 5] = [
    (Key::W, 'w'),
    (Key::A, 'a'),
    (Key::S, 's'),
    (Key::D, 'd'),
    (Key::Space, ' '),
];

/// Debug console drawn in the overlay pass.
///
/// While open it holds input focus at console priority and releases the
/// pointer grab; keys typed into it do not reach the world.
#[derive(Debug)]
pub struct DebugOverlay {
    entity: Entity,
    input: Rc<RefCell<InputCapturer>>,
    listener: InputListenerComponent,
    open: bool,
    line: String,
    history: Vec<String>,
    layers_drawn: u64,
    last_layer: Option<GuiDepth>,
}

impl DebugOverlay {
    pub fn new(bus: &MessageBus, input: &Rc<RefCell<InputCapturer>>) -> Shared<Self> {
        let listener = InputListenerComponent::new(input.borrow().focus(), InputPriority::Console);
        spawn(Self {
            entity: Entity::new("debug-overlay", bus),
            input: input.clone(),
            listener,
            open: false,
            line: String::new(),
            history: Vec::new(),
            layers_drawn: 0,
            last_layer: None,
        })
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Open or close the console.
    pub fn toggle(&mut self) {
        self.open = !self.open;
        if self.open {
            self.listener.start_listening();
            self.input.borrow_mut().set_grabbed(false);
        } else {
            self.listener.stop_listening();
            self.input.borrow_mut().set_grabbed(true);
        }
        tracing::info!(open = self.open, "debug console toggled");
    }

    /// Text typed since the last submit.
    pub fn line(&self) -> &str {
        &self.line
    }

    /// Submitted lines, oldest first.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Overlay layers drawn while open.
    pub fn layers_drawn(&self) -> u64 {
        self.layers_drawn
    }

    pub fn last_layer(&self) -> Option<GuiDepth> {
        self.last_layer
    }

    fn update(&mut self) {
        if !self.open || !self.listener.can_listen() {
            return;
        }
        let input = self.input.borrow();
        for (key, ch) in TYPED_KEYS {
            if input.is_key_pressed(key) {
                self.line.push(ch);
            }
        }
        if input.is_key_pressed(Key::Backspace) {
            self.line.pop();
        }
        if input.is_key_pressed(Key::Enter) && !self.line.is_empty() {
            let line = std::mem::take(&mut self.line);
            tracing::info!(%line, "console line submitted");
            self.history.push(line);
        }
    }

    fn render(&mut self, msg: &GuiRender) {
        if !self.open {
            return;
        }
        self.layers_drawn += 1;
        self.last_layer = Some(msg.depth);
    }
}

impl EntityBehavior for DebugOverlay {
    fn entity(&self) -> &Entity {
        &self.entity
    }

    fn entity_mut(&mut self) -> &mut Entity {
        &mut self.entity
    }

    fn register_components(this: &Shared<Self>) {
        let listener = this.borrow().listener.clone();
        attach(this, listener);
        attach(this, GlobalSubscriber::new());
        subscribe(this, |overlay: &mut Self, _: &UpdateMessage| overlay.update());
        subscribe(this, |overlay: &mut Self, msg: &GuiRender| overlay.render(msg));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxel_input::ScriptedInput;

    type Fixture = (MessageBus, Rc<RefCell<InputCapturer>>, Shared<DebugOverlay>);

    fn setup(script: ScriptedInput) -> Fixture {
        let bus = MessageBus::new();
        let input = Rc::new(RefCell::new(InputCapturer::new(Box::new(script))));
        input.borrow_mut().set_grabbed(true);
        let overlay = DebugOverlay::new(&bus, &input);
        (bus, input, overlay)
    }

    fn frame(bus: &MessageBus, input: &Rc<RefCell<InputCapturer>>) {
        input.borrow_mut().sample();
        bus.publish(&UpdateMessage::new(0, 16));
    }

    #[test]
    fn toggle_takes_focus_and_releases_grab() {
        let (_bus, input, overlay) = setup(ScriptedInput::new());
        overlay.borrow_mut().toggle();
        assert!(overlay.borrow().is_open());
        assert!(!input.borrow().is_grabbed());
        assert_eq!(input.borrow().focus().active_count(), 1);

        overlay.borrow_mut().toggle();
        assert!(input.borrow().is_grabbed());
        assert_eq!(input.borrow().focus().active_count(), 0);
    }

    #[test]
    fn typing_edits_and_submits_line() {
        let script = ScriptedInput::new()
            .then(&[Key::W])
            .then(&[])
            .then(&[Key::A])
            .then(&[Key::A, Key::D])
            .then(&[Key::Backspace])
            .then(&[Key::Enter]);
        let (bus, input, overlay) = setup(script);
        overlay.borrow_mut().toggle();
        for _ in 0..5 {
            frame(&bus, &input);
        }
        assert_eq!(overlay.borrow().line(), "wa");
        frame(&bus, &input);
        assert_eq!(overlay.borrow().line(), "");
        assert_eq!(overlay.borrow().history(), &["wa".to_string()]);
    }

    #[test]
    fn closed_console_ignores_typing() {
        let (bus, input, overlay) = setup(ScriptedInput::new().then(&[Key::W]));
        frame(&bus, &input);
        assert_eq!(overlay.borrow().line(), "");
    }

    #[test]
    fn draws_layers_only_while_open() {
        let (bus, _input, overlay) = setup(ScriptedInput::new());
        for depth in GuiDepth::ALL {
            bus.publish(&GuiRender { depth });
        }
        assert_eq!(overlay.borrow().layers_drawn(), 0);

        overlay.borrow_mut().toggle();
        for depth in GuiDepth::ALL {
            bus.publish(&GuiRender { depth });
        }
        assert_eq!(overlay.borrow().layers_drawn(), 4);
        assert_eq!(overlay.borrow().last_layer(), Some(GuiDepth::Cursor));
    }
}
