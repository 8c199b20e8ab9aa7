//! JNI function exports for Android integration
//!
//! These functions are called from Kotlin via JNI. The Kotlin side owns the
//! screen capture and the ML Kit text recognizer; frames come in as RGBA byte
//! arrays and title images go back out through an OCR callback object.

use image::GrayImage;
use jni::objects::{GlobalRef, JByteArray, JClass, JObject, JString, JValue};
use jni::sys::{jboolean, jint, jstring, JNI_FALSE, JNI_TRUE};
use jni::{JNIEnv, JavaVM};

use crate::config::Settings;
use crate::recognition::PipelineStage;
use crate::vision::{OCRError, OcrEngine};
use crate::{get_checker, init_checker};

/// Signature of `String recognize(byte[] gray, int width, int height)`
const OCR_METHOD: &str = "recognize";
const OCR_SIGNATURE: &str = "([BII)Ljava/lang/String;";

/// OCR engine backed by a Kotlin object.
pub struct JniOcrEngine {
    vm: JavaVM,
    callback: GlobalRef,
}

impl JniOcrEngine {
    pub fn new(env: &JNIEnv, callback: &JObject) -> Result<Self, jni::errors::Error> {
        Ok(Self {
            vm: env.get_java_vm()?,
            callback: env.new_global_ref(callback)?,
        })
    }

    fn call(&self, image: &GrayImage) -> Result<Option<String>, jni::errors::Error> {
        let mut env = self.vm.attach_current_thread()?;
        let pixels = env.byte_array_from_slice(image.as_raw())?;
        let result = env
            .call_method(
                &self.callback,
                OCR_METHOD,
                OCR_SIGNATURE,
                &[
                    JValue::Object(&pixels),
                    JValue::Int(image.width() as jint),
                    JValue::Int(image.height() as jint),
                ],
            )?
            .l()?;

        if result.is_null() {
            return Ok(None);
        }
        let text: String = env.get_string(&JString::from(result))?.into();
        Ok(Some(text))
    }
}

impl OcrEngine for JniOcrEngine {
    fn recognize(&mut self, image: &GrayImage) -> Result<String, OCRError> {
        match self.call(image) {
            Ok(Some(text)) => Ok(text),
            Ok(None) => Err(OCRError::NoTextFound),
            Err(e) => Err(OCRError::ProcessingError(e.to_string())),
        }
    }
}

/// Stage codes returned by `processFrame` (must match Kotlin side)
pub mod stage_codes {
    pub const ERROR: i32 = -1;
    pub const IDLE: i32 = 0;
    pub const NO_MATCH: i32 = 1;
    pub const STABLE: i32 = 2;
    pub const IN_PROGRESS: i32 = 3;
    /// Frame dropped by the update interval
    pub const SKIPPED: i32 = 4;
}

fn encode_stage(stage: PipelineStage) -> jint {
    match stage {
        PipelineStage::Idle => stage_codes::IDLE,
        PipelineStage::NoMatch => stage_codes::NO_MATCH,
        PipelineStage::Stable => stage_codes::STABLE,
        PipelineStage::HeaderChecking
        | PipelineStage::TypeClassifying
        | PipelineStage::TitleExtracting
        | PipelineStage::Searching => stage_codes::IN_PROGRESS,
    }
}

fn read_string(env: &mut JNIEnv, value: &JString) -> Option<String> {
    if value.is_null() {
        return None;
    }
    match env.get_string(value) {
        Ok(s) => Some(s.into()),
        Err(e) => {
            log::error!("Failed to get string: {}", e);
            None
        }
    }
}

fn new_string(env: &mut JNIEnv, value: &str) -> jstring {
    match env.new_string(value) {
        Ok(s) => s.into_raw(),
        Err(e) => {
            log::error!("Failed to create string: {}", e);
            std::ptr::null_mut()
        }
    }
}

/// Initialize the checker
///
/// Called once when the capture service starts.
#[no_mangle]
pub extern "system" fn Java_jp_seo_uma_eventchecker_CheckerCore_init<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    settings_json: JString<'local>,
) -> jboolean {
    #[cfg(target_os = "android")]
    android_logger::init_once(
        android_logger::Config::default()
            .with_max_level(log::LevelFilter::Debug)
            .with_tag("UmaChecker"),
    );

    log::info!("Initializing event checker");

    let settings = match read_string(&mut env, &settings_json) {
        Some(json) => match Settings::from_json(&json) {
            Ok(settings) => settings,
            Err(e) => {
                log::error!("Invalid settings, using defaults: {}", e);
                Settings::default()
            }
        },
        None => Settings::default(),
    };

    init_checker(settings);
    JNI_TRUE
}

/// Load the dataset and templates from `dir` and register the OCR callback
#[no_mangle]
pub extern "system" fn Java_jp_seo_uma_eventchecker_CheckerCore_loadAssets<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    dir: JString<'local>,
    ocr: JObject<'local>,
) -> jboolean {
    let Some(checker) = get_checker() else {
        log::error!("Checker not initialized");
        return JNI_FALSE;
    };
    let Some(dir) = read_string(&mut env, &dir) else {
        return JNI_FALSE;
    };

    let engine = match JniOcrEngine::new(&env, &ocr) {
        Ok(engine) => engine,
        Err(e) => {
            log::error!("Failed to register OCR callback: {}", e);
            return JNI_FALSE;
        }
    };

    let mut checker = match checker.lock() {
        Ok(c) => c,
        Err(e) => {
            log::error!("Failed to lock checker: {}", e);
            return JNI_FALSE;
        }
    };

    match checker.load(&dir, Box::new(engine)) {
        Ok(()) => JNI_TRUE,
        Err(e) => {
            log::error!("Failed to load assets from {}: {}", dir, e);
            JNI_FALSE
        }
    }
}

/// Process one RGBA screen frame
///
/// Returns one of [`stage_codes`].
#[no_mangle]
pub extern "system" fn Java_jp_seo_uma_eventchecker_CheckerCore_processFrame<'local>(
    env: JNIEnv<'local>,
    _class: JClass<'local>,
    frame_data: JByteArray<'local>,
    width: jint,
    height: jint,
) -> jint {
    let Some(checker) = get_checker() else {
        log::error!("Checker not initialized");
        return stage_codes::ERROR;
    };

    let frame_bytes = match env.convert_byte_array(frame_data) {
        Ok(bytes) => bytes,
        Err(e) => {
            log::error!("Failed to convert frame data: {}", e);
            return stage_codes::ERROR;
        }
    };

    let mut checker = match checker.lock() {
        Ok(c) => c,
        Err(e) => {
            log::error!("Failed to lock checker: {}", e);
            return stage_codes::ERROR;
        }
    };

    let (width, height) = (width.max(0) as u32, height.max(0) as u32);
    match checker.process_frame(&frame_bytes, width, height) {
        Ok(Some(stage)) => encode_stage(stage),
        Ok(None) => stage_codes::SKIPPED,
        Err(e) => {
            log::warn!("Frame skipped: {}", e);
            stage_codes::ERROR
        }
    }
}

/// Get the current recognition state as JSON
#[no_mangle]
pub extern "system" fn Java_jp_seo_uma_eventchecker_CheckerCore_getState<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
) -> jstring {
    let state = get_checker()
        .and_then(|checker| checker.lock().ok().map(|c| c.state()))
        .unwrap_or_default();
    let json = serde_json::to_string(&state).unwrap_or_else(|_| "{}".to_string());
    new_string(&mut env, &json)
}

/// Search events by free text, returning a JSON array
#[no_mangle]
pub extern "system" fn Java_jp_seo_uma_eventchecker_CheckerCore_search<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    query: JString<'local>,
    max_results: jint,
) -> jstring {
    let query = read_string(&mut env, &query).unwrap_or_default();
    let results = get_checker()
        .and_then(|checker| checker.lock().ok())
        .and_then(|c| c.search(&query, max_results.max(0) as usize).ok())
        .unwrap_or_default();
    let json = serde_json::to_string(&results).unwrap_or_else(|_| "[]".to_string());
    new_string(&mut env, &json)
}

/// Update settings
#[no_mangle]
pub extern "system" fn Java_jp_seo_uma_eventchecker_CheckerCore_updateSettings<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    settings_json: JString<'local>,
) -> jboolean {
    let Some(checker) = get_checker() else {
        return JNI_FALSE;
    };
    let Some(json) = read_string(&mut env, &settings_json) else {
        return JNI_FALSE;
    };

    let settings = match Settings::from_json(&json) {
        Ok(s) => s,
        Err(e) => {
            log::error!("Failed to parse settings: {}", e);
            return JNI_FALSE;
        }
    };

    let mut checker = match checker.lock() {
        Ok(c) => c,
        Err(_) => return JNI_FALSE,
    };

    match checker.update_settings(settings) {
        Ok(()) => JNI_TRUE,
        Err(e) => {
            log::error!("Failed to apply settings: {}", e);
            JNI_FALSE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_codes() {
        assert_eq!(encode_stage(PipelineStage::Idle), stage_codes::IDLE);
        assert_eq!(encode_stage(PipelineStage::Stable), stage_codes::STABLE);
        assert_eq!(encode_stage(PipelineStage::NoMatch), stage_codes::NO_MATCH);
        assert_eq!(
            encode_stage(PipelineStage::Searching),
            stage_codes::IN_PROGRESS
        );
    }
}
