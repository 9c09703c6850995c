//! Object store capability consumed by font resolution and rendering.
//!
//! The renderer never parses a PDF file itself. It asks an [`ObjectStore`]
//! for the text of an indirect object and for its stream bytes. Wrapping a
//! store in [`MemoStore`] guarantees each object is materialized at most
//! once, even when several threads ask for it at the same time.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use tracing::trace;

use crate::decode::{canonical_filter, inflate};
use crate::dictionary::{PdfObject, parse_dictionary};
use crate::error::StoreError;

/// Indirect object key: object number and generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjRef {
    pub num: u32,
    pub generation: u16,
}

impl ObjRef {
    pub fn new(num: u32, generation: u16) -> Self {
        Self { num, generation }
    }
}

impl fmt::Display for ObjRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} R", self.num, self.generation)
    }
}

/// Source of indirect objects.
///
/// Implementations resolve objects held inside compressed object streams
/// transparently; callers only see object keys. Stores are shared between
/// font-resolution threads, hence `Send + Sync`.
pub trait ObjectStore: Send + Sync {
    /// PDF syntax of the object. For streams, the stream dictionary.
    fn dictionary_of(&self, obj: ObjRef) -> Result<Arc<str>, StoreError>;

    /// Stream data with all filters applied.
    fn decoded_stream_of(&self, obj: ObjRef) -> Result<Arc<[u8]>, StoreError>;

    /// Stream data exactly as stored, filters not applied.
    fn raw_stream_of(&self, obj: ObjRef) -> Result<Arc<[u8]>, StoreError>;
}

impl<T: ObjectStore + ?Sized> ObjectStore for &T {
    fn dictionary_of(&self, obj: ObjRef) -> Result<Arc<str>, StoreError> {
        (**self).dictionary_of(obj)
    }

    fn decoded_stream_of(&self, obj: ObjRef) -> Result<Arc<[u8]>, StoreError> {
        (**self).decoded_stream_of(obj)
    }

    fn raw_stream_of(&self, obj: ObjRef) -> Result<Arc<[u8]>, StoreError> {
        (**self).raw_stream_of(obj)
    }
}

impl<T: ObjectStore + ?Sized> ObjectStore for Arc<T> {
    fn dictionary_of(&self, obj: ObjRef) -> Result<Arc<str>, StoreError> {
        (**self).dictionary_of(obj)
    }

    fn decoded_stream_of(&self, obj: ObjRef) -> Result<Arc<[u8]>, StoreError> {
        (**self).decoded_stream_of(obj)
    }

    fn raw_stream_of(&self, obj: ObjRef) -> Result<Arc<[u8]>, StoreError> {
        (**self).raw_stream_of(obj)
    }
}

type Slot<T> = Arc<OnceLock<Result<T, StoreError>>>;
type SlotMap<T> = Mutex<HashMap<ObjRef, Slot<T>>>;

/// Memoizing wrapper around another store.
///
/// The first request for an object runs the inner lookup; concurrent
/// requests for the same object wait for that single run and share its
/// result, failures included.
pub struct MemoStore<S> {
    inner: S,
    dictionaries: SlotMap<Arc<str>>,
    decoded: SlotMap<Arc<[u8]>>,
    raw: SlotMap<Arc<[u8]>>,
}

impl<S: ObjectStore> MemoStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            dictionaries: Mutex::default(),
            decoded: Mutex::default(),
            raw: Mutex::default(),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Number of distinct objects whose decoded stream was requested.
    pub fn decoded_len(&self) -> usize {
        self.decoded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn memo<T: Clone>(
        map: &SlotMap<T>,
        obj: ObjRef,
        load: impl FnOnce() -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let slot = {
            let mut guard = map.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(guard.entry(obj).or_default())
        };
        slot.get_or_init(|| {
            trace!(object = %obj, "materializing object");
            load()
        })
        .clone()
    }
}

impl<S: ObjectStore> ObjectStore for MemoStore<S> {
    fn dictionary_of(&self, obj: ObjRef) -> Result<Arc<str>, StoreError> {
        Self::memo(&self.dictionaries, obj, || self.inner.dictionary_of(obj))
    }

    fn decoded_stream_of(&self, obj: ObjRef) -> Result<Arc<[u8]>, StoreError> {
        Self::memo(&self.decoded, obj, || self.inner.decoded_stream_of(obj))
    }

    fn raw_stream_of(&self, obj: ObjRef) -> Result<Arc<[u8]>, StoreError> {
        Self::memo(&self.raw, obj, || self.inner.raw_stream_of(obj))
    }
}

#[derive(Debug, Clone)]
struct StoredObject {
    text: Arc<str>,
    stream: Option<Arc<[u8]>>,
}

/// Object table held in memory, keyed by [`ObjRef`].
///
/// Streams are stored encoded; `FlateDecode` (and unfiltered) streams are
/// decoded on request. Useful for tests and for callers that already hold
/// an object table from their own parser.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    objects: HashMap<ObjRef, StoredObject>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a non-stream object given as PDF syntax.
    pub fn insert_object(&mut self, obj: ObjRef, text: impl Into<String>) {
        let text: String = text.into();
        self.objects.insert(
            obj,
            StoredObject {
                text: text.into(),
                stream: None,
            },
        );
    }

    /// Store a stream object: its dictionary text and its encoded bytes.
    pub fn insert_stream(&mut self, obj: ObjRef, dict_text: impl Into<String>, raw: Vec<u8>) {
        let text: String = dict_text.into();
        self.objects.insert(
            obj,
            StoredObject {
                text: text.into(),
                stream: Some(raw.into()),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    fn get(&self, obj: ObjRef) -> Result<&StoredObject, StoreError> {
        self.objects.get(&obj).ok_or(StoreError::MissingObject(obj))
    }
}

impl ObjectStore for InMemoryStore {
    fn dictionary_of(&self, obj: ObjRef) -> Result<Arc<str>, StoreError> {
        Ok(Arc::clone(&self.get(obj)?.text))
    }

    fn decoded_stream_of(&self, obj: ObjRef) -> Result<Arc<[u8]>, StoreError> {
        let stored = self.get(obj)?;
        let raw = stored.stream.as_ref().ok_or(StoreError::NotAStream(obj))?;
        let dict = parse_dictionary(stored.text.as_bytes()).unwrap_or_default();
        let filters = filter_names(dict.get("Filter"));
        match filters.as_slice() {
            [] => Ok(Arc::clone(raw)),
            ["FlateDecode"] => {
                if dict
                    .get_dict("DecodeParms")
                    .and_then(|p| p.get_i64("Predictor"))
                    .is_some_and(|p| p > 1)
                {
                    return Err(StoreError::Decode {
                        object: obj,
                        message: "predictors are not supported".to_string(),
                    });
                }
                inflate(raw)
                    .map(Arc::from)
                    .map_err(|message| StoreError::Decode {
                        object: obj,
                        message,
                    })
            }
            other => Err(StoreError::Decode {
                object: obj,
                message: format!("unsupported filter chain {other:?}"),
            }),
        }
    }

    fn raw_stream_of(&self, obj: ObjRef) -> Result<Arc<[u8]>, StoreError> {
        let stored = self.get(obj)?;
        stored
            .stream
            .as_ref()
            .map(Arc::clone)
            .ok_or(StoreError::NotAStream(obj))
    }
}

/// Canonical filter names from a `/Filter` (or inline `/F`) value.
pub fn filter_names(value: Option<&PdfObject>) -> Vec<&str> {
    match value {
        Some(PdfObject::Name(n)) => vec![canonical_filter(n)],
        Some(PdfObject::Array(items)) => items
            .iter()
            .filter_map(PdfObject::as_name)
            .map(canonical_filter)
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::ZlibEncoder;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn zlib(data: &[u8]) -> Vec<u8> {
        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    #[test]
    fn objref_display() {
        assert_eq!(ObjRef::new(12, 3).to_string(), "12 3 R");
    }

    #[test]
    fn in_memory_plain_object() {
        let mut store = InMemoryStore::new();
        store.insert_object(ObjRef::new(1, 0), "<< /Type /Font >>");
        assert_eq!(&*store.dictionary_of(ObjRef::new(1, 0)).unwrap(), "<< /Type /Font >>");
        assert_eq!(
            store.decoded_stream_of(ObjRef::new(1, 0)),
            Err(StoreError::NotAStream(ObjRef::new(1, 0)))
        );
        assert_eq!(
            store.dictionary_of(ObjRef::new(2, 0)),
            Err(StoreError::MissingObject(ObjRef::new(2, 0)))
        );
    }

    #[test]
    fn in_memory_flate_stream_is_inflated() {
        let mut store = InMemoryStore::new();
        let r = ObjRef::new(4, 0);
        store.insert_stream(r, "<< /Filter /FlateDecode >>", zlib(b"BT ET"));
        assert_eq!(&*store.decoded_stream_of(r).unwrap(), b"BT ET");
        assert_ne!(&*store.raw_stream_of(r).unwrap(), b"BT ET");
    }

    #[test]
    fn in_memory_filter_array_of_one() {
        let mut store = InMemoryStore::new();
        let r = ObjRef::new(4, 0);
        store.insert_stream(r, "<< /Filter [/FlateDecode] >>", zlib(b"q Q"));
        assert_eq!(&*store.decoded_stream_of(r).unwrap(), b"q Q");
    }

    #[test]
    fn in_memory_corrupt_flate_is_decode_error() {
        let mut store = InMemoryStore::new();
        let r = ObjRef::new(5, 0);
        store.insert_stream(r, "<< /Filter /FlateDecode >>", vec![0xFF; 8]);
        let err = store.decoded_stream_of(r).unwrap_err();
        assert!(err.is_corrupt_stream());
    }

    #[test]
    fn in_memory_unsupported_filter() {
        let mut store = InMemoryStore::new();
        let r = ObjRef::new(6, 0);
        store.insert_stream(r, "<< /Filter /LZWDecode >>", vec![1, 2, 3]);
        assert!(matches!(
            store.decoded_stream_of(r),
            Err(StoreError::Decode { .. })
        ));
    }

    #[test]
    fn filter_name_forms() {
        let obj = crate::dictionary::parse_object("[/Fl /DCT]").unwrap();
        assert_eq!(filter_names(Some(&obj)), vec!["FlateDecode", "DCTDecode"]);
        assert!(filter_names(None).is_empty());
    }

    struct CountingStore {
        inner: InMemoryStore,
        decodes: AtomicUsize,
    }

    impl ObjectStore for CountingStore {
        fn dictionary_of(&self, obj: ObjRef) -> Result<Arc<str>, StoreError> {
            self.inner.dictionary_of(obj)
        }

        fn decoded_stream_of(&self, obj: ObjRef) -> Result<Arc<[u8]>, StoreError> {
            self.decodes.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(20));
            self.inner.decoded_stream_of(obj)
        }

        fn raw_stream_of(&self, obj: ObjRef) -> Result<Arc<[u8]>, StoreError> {
            self.inner.raw_stream_of(obj)
        }
    }

    fn counting_store() -> CountingStore {
        let mut inner = InMemoryStore::new();
        inner.insert_stream(ObjRef::new(1, 0), "<< /Filter /FlateDecode >>", zlib(b"font"));
        CountingStore {
            inner,
            decodes: AtomicUsize::new(0),
        }
    }

    #[test]
    fn memo_decodes_once() {
        let store = MemoStore::new(counting_store());
        for _ in 0..3 {
            assert_eq!(&*store.decoded_stream_of(ObjRef::new(1, 0)).unwrap(), b"font");
        }
        assert_eq!(store.inner().decodes.load(Ordering::SeqCst), 1);
        assert_eq!(store.decoded_len(), 1);
    }

    #[test]
    fn memo_is_single_flight_under_concurrency() {
        let store = MemoStore::new(counting_store());
        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    let bytes = store.decoded_stream_of(ObjRef::new(1, 0)).unwrap();
                    assert_eq!(&*bytes, b"font");
                });
            }
        });
        assert_eq!(store.inner().decodes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn memo_shares_failures() {
        let store = MemoStore::new(counting_store());
        let missing = ObjRef::new(99, 0);
        assert!(store.decoded_stream_of(missing).is_err());
        assert!(store.decoded_stream_of(missing).is_err());
        assert_eq!(store.inner().decodes.load(Ordering::SeqCst), 1);
    }
}
