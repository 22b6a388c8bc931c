//! `<input type="file">` 读取

use receiptpal::error::{PalError, PalResult};
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

/// 选中文件的名称、MIME 类型与内容
pub struct PickedFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// 事件目标输入框中的第一个文件
pub fn first_file(ev: &web_sys::Event) -> Option<web_sys::File> {
    ev.target()?
        .dyn_into::<web_sys::HtmlInputElement>()
        .ok()?
        .files()?
        .get(0)
}

pub async fn read_file(file: &web_sys::File) -> PalResult<PickedFile> {
    let buffer = JsFuture::from(file.array_buffer())
        .await
        .map_err(|e| {
            log::warn!("reading {} failed: {e:?}", file.name());
            PalError::validation("Could not read the selected file.").in_op("file.read")
        })?;
    Ok(PickedFile {
        name: file.name(),
        content_type: file.type_(),
        bytes: js_sys::Uint8Array::new(&buffer).to_vec(),
    })
}
