use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{layout::Rect, Frame};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tui_confirm::{
    create_portal, ConfirmError, ConfirmFactory, ConfirmOptions, ConfirmProps, Document, DirectMounter,
    Element, MountError, MountPoint, Mounter, PortalOptions, Responder, View,
};

type Answer = Responder<bool, String>;
type Props = ConfirmProps<String, bool, String>;
type DialogFn = fn(Props) -> Result<Box<dyn View>>;

/// Minimal yes/no dialog: `y` resolves, `n` rejects with "cancelled"
struct YesNo {
    message: String,
    responder: Answer,
}

impl View for YesNo {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        frame.render_widget(ratatui::widgets::Paragraph::new(self.message.clone()), area);
    }

    fn handle_key_event(&mut self, event: KeyEvent) -> Result<bool> {
        match event.code {
            KeyCode::Char('y') => self.responder.resolve(true),
            KeyCode::Char('n') => self.responder.reject("cancelled".to_string()),
            _ => return Ok(false),
        }
        Ok(true)
    }
}

fn yes_no(props: Props) -> Result<Box<dyn View>> {
    Ok(Box::new(YesNo {
        message: props.props,
        responder: props.responder,
    }))
}

fn key(c: char) -> KeyEvent {
    KeyEvent::from(KeyCode::Char(c))
}

fn direct_factory(document: &Document) -> (Arc<DirectMounter>, ConfirmFactory<DialogFn, String, bool, String>) {
    let mounter = Arc::new(DirectMounter::new(document.clone()));
    let factory = ConfirmFactory::new(
        mounter.clone(),
        yes_no as DialogFn,
        ConfirmOptions::default(),
    );
    (mounter, factory)
}

#[tokio::test(start_paused = true)]
async fn resolve_settles_immediately_and_tears_down_after_grace_delay() {
    let document = Document::new();
    let (mounter, factory) = direct_factory(&document);

    let confirmation = factory.invoke("Delete?".to_string());
    let instance = confirmation.key().cloned().unwrap();
    assert!(mounter.is_mounted(&instance));

    assert!(document.handle_key_event(key('y')).unwrap());
    assert!(confirmation.await.unwrap());
    assert!(mounter.is_mounted(&instance));

    tokio::time::sleep(Duration::from_millis(1001)).await;
    assert!(!mounter.is_mounted(&instance));
    assert_eq!(document.rendered_count(), 0);
    assert_eq!(document.node_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn reject_path_carries_value_and_still_tears_down() {
    let document = Document::new();
    let (mounter, factory) = direct_factory(&document);

    let confirmation = factory.invoke("Delete?".to_string());
    document.handle_key_event(key('n')).unwrap();

    match confirmation.await {
        Err(ConfirmError::Rejected(reason)) => assert_eq!(reason, "cancelled"),
        other => panic!("expected rejection, got {:?}", other),
    }

    tokio::time::sleep(Duration::from_millis(1001)).await;
    assert_eq!(mounter.mounted_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn only_first_answer_counts() {
    let responders = Arc::new(Mutex::new(Vec::<Answer>::new()));
    let captured = responders.clone();
    let capture = move |props: Props| -> Result<Box<dyn View>> {
        captured.lock().unwrap().push(props.responder.clone());
        yes_no(props)
    };
    let document = Document::new();
    let factory: ConfirmFactory<_, String, bool, String> = ConfirmFactory::direct(document.clone(), capture);

    let resolved_first = factory.invoke("a".to_string());
    let rejected_first = factory.invoke("b".to_string());
    let (a, b) = {
        let responders = responders.lock().unwrap();
        (responders[0].clone(), responders[1].clone())
    };

    a.resolve(true);
    a.reject("late".to_string());
    b.reject("first".to_string());
    b.resolve(true);

    assert!(resolved_first.await.unwrap());
    assert_eq!(rejected_first.await.unwrap_err().into_rejection().as_deref(), Some("first"));

    tokio::time::sleep(Duration::from_millis(1001)).await;
    assert_eq!(document.rendered_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn concurrent_invocations_are_independent() {
    let document = Document::new();
    let (mounter, factory) = direct_factory(&document);

    let first = factory.invoke("first".to_string());
    let second = factory.invoke("second".to_string());
    let first_key = first.key().cloned().unwrap();
    let second_key = second.key().cloned().unwrap();
    assert_ne!(first_key, second_key);

    // The second dialog is topmost, so it receives the key press.
    document.handle_key_event(key('y')).unwrap();
    assert!(second.await.unwrap());

    tokio::time::sleep(Duration::from_millis(1001)).await;
    assert!(mounter.is_mounted(&first_key));
    assert!(!mounter.is_mounted(&second_key));

    document.handle_key_event(key('n')).unwrap();
    assert!(first.await.is_err());
}

#[tokio::test]
async fn mount_failure_rejects_with_the_mount_error() {
    let document = Document::new();
    let detached = document.create_element(document.body()).unwrap();
    document.remove_node(detached).unwrap();
    let mounter = Arc::new(DirectMounter::new(document.clone()));
    let factory = ConfirmFactory::new(
        mounter.clone(),
        yes_no as DialogFn,
        ConfirmOptions::default().with_target(detached),
    );

    let confirmation = factory.invoke("nowhere".to_string());
    assert!(confirmation.key().is_none());

    match confirmation.await {
        Err(ConfirmError::Mount(MountError::TargetNotFound(node))) => assert_eq!(node, detached),
        other => panic!("expected mount failure, got {:?}", other),
    }
    assert_eq!(mounter.mounted_count(), 0);
    assert_eq!(document.node_count(), 1);
}

#[test]
fn mount_then_unmount_leaves_no_residue_for_both_mounters() {
    struct Blank;
    impl View for Blank {
        fn render(&mut self, _frame: &mut Frame, _area: Rect) {}
    }

    let document = Document::new();
    let direct = DirectMounter::new(document.clone());
    let instance = direct.mount(Element::from_view(Box::new(Blank)), None).unwrap();
    direct.unmount(&instance);
    direct.unmount(&instance);
    assert_eq!(direct.mounted_count(), 0);
    assert_eq!(document.rendered_count(), 0);

    let (portal, mount_point): (_, MountPoint) = create_portal(PortalOptions::default());
    let instance = portal.mount(Element::from_view(Box::new(Blank)), None).unwrap();
    portal.unmount(&instance);
    portal.unmount(&instance);
    assert_eq!(portal.mounted_count(), 0);
    assert!(mount_point.is_empty());
}

#[tokio::test(start_paused = true)]
async fn portal_confirmation_renders_through_mount_point() {
    let (mounter, mount_point) = create_portal(PortalOptions::default());
    let factory = ConfirmFactory::new(
        Arc::new(mounter),
        yes_no as DialogFn,
        ConfirmOptions::default().with_unmount_delay(Duration::from_millis(300)),
    );

    // The mount point itself lives in the application's own tree.
    let document = Document::new();
    let host = document.create_element(document.body()).unwrap();
    document.create_root(host).unwrap().render(Box::new(mount_point.clone())).unwrap();

    let confirmation = factory.invoke("Proceed?".to_string());
    assert_eq!(mount_point.keys().len(), 1);

    document.handle_key_event(key('y')).unwrap();
    assert!(confirmation.await.unwrap());

    tokio::time::sleep(Duration::from_millis(301)).await;
    assert!(mount_point.is_empty());
    assert_eq!(factory.mounter().mounted_count(), 0);
}
