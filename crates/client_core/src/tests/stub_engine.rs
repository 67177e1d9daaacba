//! Deterministic call-counting engine shared by the gateway and session tests.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use shared::{
    domain::FaceRect,
    protocol::{AnnotatedFaceCrop, FaceCropPayload, FaceSwapArgs, FaceSwapPayload, ProcessFaceArgs},
};
use tokio::sync::{Notify, Semaphore};

use crate::{
    payload::fixtures::{jpeg_b64, png_b64},
    EngineError, FaceEngine,
};

pub(crate) fn annotated_face(seed: u8) -> FaceCropPayload {
    let offset = i32::from(seed);
    FaceCropPayload::Annotated(AnnotatedFaceCrop {
        base64: png_b64(seed),
        debug_base64: jpeg_b64(seed),
        detection_rect: Some(FaceRect::new(40 + offset, 60, 100, 100)),
        search_rect: Some(FaceRect::new(10 + offset, 0, 160, 200)),
    })
}

pub(crate) fn faces(count: u8) -> Vec<FaceCropPayload> {
    (0..count).map(annotated_face).collect()
}

pub(crate) fn composite(strength: Option<f64>) -> FaceSwapPayload {
    FaceSwapPayload {
        base64: png_b64(200),
        color_correction_strength: strength,
    }
}

pub(crate) struct StubEngine {
    process_face_calls: AtomicUsize,
    face_swap_calls: AtomicUsize,
    extract_args: Mutex<Vec<ProcessFaceArgs>>,
    swap_args: Mutex<Vec<FaceSwapArgs>>,
    faces: Mutex<Result<Vec<FaceCropPayload>, EngineError>>,
    swap: Mutex<Result<FaceSwapPayload, EngineError>>,
    gate: Option<Arc<Semaphore>>,
    entered: Arc<Notify>,
}

impl StubEngine {
    pub(crate) fn new() -> Self {
        Self {
            process_face_calls: AtomicUsize::new(0),
            face_swap_calls: AtomicUsize::new(0),
            extract_args: Mutex::new(Vec::new()),
            swap_args: Mutex::new(Vec::new()),
            faces: Mutex::new(Ok(Vec::new())),
            swap: Mutex::new(Ok(composite(None))),
            gate: None,
            entered: Arc::new(Notify::new()),
        }
    }

    pub(crate) fn with_faces(self, faces: Vec<FaceCropPayload>) -> Self {
        self.set_faces(Ok(faces));
        self
    }

    pub(crate) fn with_swap(self, swap: Result<FaceSwapPayload, EngineError>) -> Self {
        self.set_swap(swap);
        self
    }

    /// Every call waits for [`StubEngine::release`] before answering.
    pub(crate) fn gated(mut self) -> Self {
        self.gate = Some(Arc::new(Semaphore::new(0)));
        self
    }

    pub(crate) fn set_faces(&self, faces: Result<Vec<FaceCropPayload>, EngineError>) {
        *self.faces.lock().expect("faces lock") = faces;
    }

    pub(crate) fn set_swap(&self, swap: Result<FaceSwapPayload, EngineError>) {
        *self.swap.lock().expect("swap lock") = swap;
    }

    pub(crate) fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    pub(crate) async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    pub(crate) fn process_face_calls(&self) -> usize {
        self.process_face_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn face_swap_calls(&self) -> usize {
        self.face_swap_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn swap_args(&self) -> Vec<FaceSwapArgs> {
        self.swap_args.lock().expect("swap args lock").clone()
    }

    pub(crate) fn extract_args(&self) -> Vec<ProcessFaceArgs> {
        self.extract_args.lock().expect("extract args lock").clone()
    }

    async fn pass_gate(&self) {
        self.entered.notify_one();
        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
    }
}

#[async_trait]
impl FaceEngine for StubEngine {
    async fn process_face(
        &self,
        args: ProcessFaceArgs,
    ) -> Result<Vec<FaceCropPayload>, EngineError> {
        self.process_face_calls.fetch_add(1, Ordering::SeqCst);
        self.extract_args.lock().expect("extract args lock").push(args);
        self.pass_gate().await;
        self.faces.lock().expect("faces lock").clone()
    }

    async fn face_swap(&self, args: FaceSwapArgs) -> Result<FaceSwapPayload, EngineError> {
        self.face_swap_calls.fetch_add(1, Ordering::SeqCst);
        self.swap_args.lock().expect("swap args lock").push(args);
        self.pass_gate().await;
        self.swap.lock().expect("swap lock").clone()
    }
}
