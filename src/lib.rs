pub mod core;
pub mod storage;
pub mod index;

/*
┌──────────────────────────────────────────────────────────────────────────────────────┐
│                               TINDEX STRUCT ARCHITECTURE                               │
└──────────────────────────────────────────────────────────────────────────────────────┘

┌──────────────────────────────────── INDEX LAYER ─────────────────────────────────────┐
│                                                                                        │
│  ┌──────────────────────────────────────────────────────────────────────────────┐    │
│  │                             struct TFileIndex                                 │    │
│  │  config: Config                 // paths, limits, populate policy             │    │
│  │  layout: IndexLayout            // <tableSetId>-<column>-<version>.tindex     │    │
│  │  cache: TFileCache              // one current reader per column              │    │
│  │  _lock: FileLock                // single writer per directory               │    │
│  └──────────────────────────────────────────────────────────────────────────────┘    │
│                                                                                        │
│  TFileCache ──maps──> CacheKey(tableSetId, column, type) ──to──> Arc<TFileReader>     │
│                                                                                        │
│  TFileWriter<S: StoreWrite> ──writes──> header │ trailer │ data blocks │ fst          │
│                                                                                        │
│  TFileReader ──owns──> fst::Map (in memory) + Box<dyn StoreRead> (mmap)               │
│        │                                                                               │
│        └──iter()──> TFileIter ──streams──> (value, table ids)                         │
│                                                                                        │
└────────────────────────────────────────────────────────────────────────────────────────┘

┌──────────────────────────────────── STORAGE LAYER ───────────────────────────────────┐
│  FileStoreWriter (temp file + rename)   MmapStore (read-only)   MemStore (in memory)  │
└────────────────────────────────────────────────────────────────────────────────────────┘
*/
