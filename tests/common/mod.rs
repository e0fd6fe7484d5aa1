//! Scripted in-memory object client for adapter tests.
#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use object_fs::models::{
    listing::{CommonPrefix, ListObjectsOutput, ListObjectsParams, ObjectRecord, SizeValue},
    options::{MetadataDirective, ObjectOptions},
    output::{
        CopyObjectOutput, DeleteObjectError, DeleteObjectOutput, DeleteObjectsOutput,
        GetObjectOutput, HeadObjectOutput, ObjectIdentifier, PutObjectOutput,
    },
};
use object_fs::{BackendError, BackendResult, ObjectClient};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Mutex;

pub const BUCKET: &str = "test-bucket";
pub const LAST_MODIFIED: &str = "2024-01-02T03:04:05Z";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Op {
    Head,
    Put,
    Get,
    Delete,
    DeleteMany,
    List,
    Copy,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    Head(String),
    Put { key: String, body: Bytes, options: ObjectOptions },
    Get(String),
    Delete(String),
    DeleteMany(Vec<String>),
    List(ListObjectsParams),
    Copy { source: String, destination: String, options: ObjectOptions },
}

impl Call {
    pub fn op(&self) -> Op {
        match self {
            Call::Head(_) => Op::Head,
            Call::Put { .. } => Op::Put,
            Call::Get(_) => Op::Get,
            Call::Delete(_) => Op::Delete,
            Call::DeleteMany(_) => Op::DeleteMany,
            Call::List(_) => Op::List,
            Call::Copy { .. } => Op::Copy,
        }
    }
}

#[derive(Clone, Debug)]
pub struct StoredEntry {
    pub body: Bytes,
    pub content_type: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Default)]
struct State {
    objects: BTreeMap<String, StoredEntry>,
    calls: Vec<Call>,
    pages: VecDeque<ListObjectsOutput>,
    failures: HashSet<Op>,
    rejected_deletes: HashSet<String>,
    omit_body: bool,
}

#[derive(Default)]
pub struct MockObjectClient {
    state: Mutex<State>,
}

impl MockObjectClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(self, key: &str, body: &str) -> Self {
        self.insert(key, body);
        self
    }

    pub fn insert(&self, key: &str, body: &str) {
        self.state.lock().unwrap().objects.insert(
            key.to_string(),
            StoredEntry {
                body: Bytes::copy_from_slice(body.as_bytes()),
                content_type: None,
                metadata: BTreeMap::new(),
            },
        );
    }

    /// Serve `page` for the next listing call instead of computing one.
    pub fn queue_page(&self, page: ListObjectsOutput) {
        self.state.lock().unwrap().pages.push_back(page);
    }

    /// Make every subsequent call of `op` fail.
    pub fn fail(&self, op: Op) {
        self.state.lock().unwrap().failures.insert(op);
    }

    /// Report `key` as a per-key error in batch deletes.
    pub fn reject_delete_of(&self, key: &str) {
        self.state.lock().unwrap().rejected_deletes.insert(key.to_string());
    }

    /// Answer gets without a body.
    pub fn omit_body(&self) {
        self.state.lock().unwrap().omit_body = true;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, op: Op) -> usize {
        self.calls().iter().filter(|call| call.op() == op).count()
    }

    pub fn object(&self, key: &str) -> Option<StoredEntry> {
        self.state.lock().unwrap().objects.get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.state.lock().unwrap().objects.keys().cloned().collect()
    }

    fn record(&self, call: Call) -> BackendResult<()> {
        let mut state = self.state.lock().unwrap();
        let op = call.op();
        state.calls.push(call);
        if state.failures.contains(&op) {
            return Err(BackendError::Request(format!("injected {op:?} failure")));
        }
        Ok(())
    }

    fn not_found(key: &str) -> BackendError {
        BackendError::ObjectNotFound {
            bucket: BUCKET.to_string(),
            key: key.to_string(),
        }
    }
}

#[async_trait]
impl ObjectClient for MockObjectClient {
    async fn head_object(&self, _bucket: &str, key: &str) -> BackendResult<HeadObjectOutput> {
        self.record(Call::Head(key.to_string()))?;
        let entry = self.object(key).ok_or_else(|| Self::not_found(key))?;
        Ok(HeadObjectOutput {
            content_length: Some(SizeValue::Integer(entry.body.len() as i64)),
            content_type: entry.content_type,
            last_modified: Some(LAST_MODIFIED.to_string()),
            etag: None,
            metadata: entry.metadata,
        })
    }

    async fn put_object(
        &self,
        _bucket: &str,
        key: &str,
        body: Bytes,
        options: ObjectOptions,
    ) -> BackendResult<PutObjectOutput> {
        self.record(Call::Put {
            key: key.to_string(),
            body: body.clone(),
            options: options.clone(),
        })?;
        self.state.lock().unwrap().objects.insert(
            key.to_string(),
            StoredEntry {
                body,
                content_type: options.content_type,
                metadata: options.metadata.unwrap_or_default(),
            },
        );
        Ok(PutObjectOutput::default())
    }

    async fn get_object(&self, _bucket: &str, key: &str) -> BackendResult<GetObjectOutput> {
        self.record(Call::Get(key.to_string()))?;
        let entry = self.object(key).ok_or_else(|| Self::not_found(key))?;
        let omit_body = self.state.lock().unwrap().omit_body;
        Ok(GetObjectOutput {
            content_length: Some(SizeValue::Integer(entry.body.len() as i64)),
            body: (!omit_body).then_some(entry.body),
            content_type: entry.content_type,
            last_modified: Some(LAST_MODIFIED.to_string()),
            etag: None,
            metadata: entry.metadata,
        })
    }

    async fn delete_object(&self, _bucket: &str, key: &str) -> BackendResult<DeleteObjectOutput> {
        self.record(Call::Delete(key.to_string()))?;
        let removed = self.state.lock().unwrap().objects.remove(key).is_some();
        Ok(DeleteObjectOutput {
            delete_marker: removed,
            version_id: None,
        })
    }

    async fn delete_objects(
        &self,
        _bucket: &str,
        objects: Vec<ObjectIdentifier>,
    ) -> BackendResult<DeleteObjectsOutput> {
        self.record(Call::DeleteMany(
            objects.iter().map(|object| object.key.clone()).collect(),
        ))?;
        let mut state = self.state.lock().unwrap();
        let mut output = DeleteObjectsOutput::default();
        for object in objects {
            if state.rejected_deletes.contains(&object.key) {
                output.errors.push(DeleteObjectError {
                    key: object.key,
                    message: "AccessDenied".to_string(),
                });
            } else {
                state.objects.remove(&object.key);
                output.deleted.push(object);
            }
        }
        Ok(output)
    }

    /// Single unpaginated page unless a scripted page is queued.
    async fn list_objects(
        &self,
        _bucket: &str,
        params: ListObjectsParams,
    ) -> BackendResult<ListObjectsOutput> {
        self.record(Call::List(params.clone()))?;
        let mut state = self.state.lock().unwrap();
        if let Some(page) = state.pages.pop_front() {
            return Ok(page);
        }

        let prefix = params.prefix.unwrap_or_default();
        let mut output = ListObjectsOutput::default();
        for (key, entry) in state.objects.range(prefix.clone()..) {
            let Some(rest) = key.strip_prefix(&prefix) else {
                break;
            };
            if let Some(delimiter) = params.delimiter.as_deref() {
                if let Some(pos) = rest.find(delimiter) {
                    let common = format!("{}{}", prefix, &rest[..pos + delimiter.len()]);
                    if output.common_prefixes.last().and_then(|p| p.prefix.as_deref())
                        != Some(common.as_str())
                    {
                        output.common_prefixes.push(CommonPrefix::new(common));
                    }
                    continue;
                }
            }
            output.contents.push(
                ObjectRecord::new(key.clone())
                    .size(entry.body.len() as i64)
                    .last_modified(LAST_MODIFIED),
            );
        }

        if let Some(max_keys) = params.max_keys {
            output.contents.truncate(max_keys);
        }
        output.key_count = output.contents.len() + output.common_prefixes.len();
        Ok(output)
    }

    async fn copy_object(
        &self,
        _source_bucket: &str,
        source_key: &str,
        _destination_bucket: &str,
        destination_key: &str,
        options: ObjectOptions,
    ) -> BackendResult<CopyObjectOutput> {
        self.record(Call::Copy {
            source: source_key.to_string(),
            destination: destination_key.to_string(),
            options: options.clone(),
        })?;
        let mut entry = self.object(source_key).ok_or_else(|| Self::not_found(source_key))?;
        if options.metadata_directive == Some(MetadataDirective::Replace) {
            entry.content_type = options.content_type;
            entry.metadata = options.metadata.unwrap_or_default();
        }
        self.state
            .lock()
            .unwrap()
            .objects
            .insert(destination_key.to_string(), entry);
        Ok(CopyObjectOutput::default())
    }
}

/// Listing page with the given object keys and common prefixes.
pub fn page(keys: &[&str], prefixes: &[&str], next_token: Option<&str>) -> ListObjectsOutput {
    ListObjectsOutput {
        contents: keys
            .iter()
            .map(|key| ObjectRecord::new(*key).size(1_i64).last_modified(LAST_MODIFIED))
            .collect(),
        common_prefixes: prefixes.iter().map(|prefix| CommonPrefix::new(*prefix)).collect(),
        is_truncated: next_token.is_some(),
        next_continuation_token: next_token.map(str::to_string),
        key_count: keys.len() + prefixes.len(),
    }
}
