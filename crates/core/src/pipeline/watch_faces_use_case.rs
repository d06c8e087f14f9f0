use std::time::{Duration, Instant, SystemTime};

use crossbeam_channel::Receiver;
use thiserror::Error;

use crate::detection::domain::face_detection::FaceDetection;
use crate::detection::domain::face_detector::FaceDetector;
use crate::identity::domain::embedding_store::{EmbeddingStore, StoreError};
use crate::identity::domain::identity_record::{IdentityError, IdentityRecord};
use crate::identity::domain::similarity_matcher::{MatchError, SimilarityMatcher};
use crate::notification::domain::identity::Identity;
use crate::notification::domain::notification_sink::NotificationSink;
use crate::notification::domain::notification_throttler::NotificationThrottler;
use crate::notification::domain::recognition_event::RecognitionEvent;
use crate::presentation::overlay;
use crate::presentation::snapshot_recorder::SnapshotRecorder;
use crate::shared::frame::Frame;
use crate::video::domain::video_reader::FrameResult;

use super::operator_command::OperatorCommand;
use super::pipeline_logger::PipelineLogger;
use super::recognition::Recognition;

#[derive(Error, Debug)]
pub enum WatchError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("invalid enrollment: {0}")]
    Identity(#[from] IdentityError),
    #[error(transparent)]
    Match(#[from] MatchError),
    #[error("no face detected in the latest frame")]
    NoFaceDetected,
}

/// Why [`WatchFacesUseCase::run`] returned.
#[derive(Debug, Clone, PartialEq)]
pub enum StopReason {
    Quit,
    SourceExhausted,
    SourceFailed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub frames: usize,
    pub events: usize,
    pub enrolled: usize,
    pub stop: StopReason,
}

/// Live recognition loop: detect → match → throttle → notify, one frame at a time.
///
/// Owns the throttle state and a snapshot of the enrolled identities. The
/// snapshot is loaded once at construction and extended in place by
/// enrollments, so matching never re-reads the store.
pub struct WatchFacesUseCase {
    detector: Box<dyn FaceDetector>,
    store: Box<dyn EmbeddingStore>,
    identities: Vec<IdentityRecord>,
    matcher: SimilarityMatcher,
    throttler: NotificationThrottler,
    cooldown: Duration,
    sinks: Vec<Box<dyn NotificationSink>>,
    snapshots: Option<SnapshotRecorder>,
    logger: Box<dyn PipelineLogger>,
    last_detections: Vec<FaceDetection>,
}

impl WatchFacesUseCase {
    /// Loads the enrolled identities. A corrupt store is returned as an
    /// error, never as an empty one.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        detector: Box<dyn FaceDetector>,
        store: Box<dyn EmbeddingStore>,
        matcher: SimilarityMatcher,
        cooldown: Duration,
        sinks: Vec<Box<dyn NotificationSink>>,
        snapshots: Option<SnapshotRecorder>,
        mut logger: Box<dyn PipelineLogger>,
    ) -> Result<Self, WatchError> {
        let identities = store.load()?;
        logger.info(&format!(
            "Loaded {} enrolled identities (threshold {:.2}, cooldown {}s)",
            identities.len(),
            matcher.threshold(),
            cooldown.as_secs_f64()
        ));

        Ok(Self {
            detector,
            store,
            identities,
            matcher,
            throttler: NotificationThrottler::new(),
            cooldown,
            sinks,
            snapshots,
            logger,
            last_detections: Vec::new(),
        })
    }

    pub fn identities(&self) -> &[IdentityRecord] {
        &self.identities
    }

    /// Runs one iteration over `frame` as observed at `now`.
    ///
    /// A detector failure counts as an empty frame. A face with a degenerate
    /// embedding is logged and left out. Sink and snapshot failures are
    /// logged. Only a dimension mismatch against the store is an error.
    pub fn process_frame(
        &mut self,
        frame: &Frame,
        now: SystemTime,
    ) -> Result<Vec<Recognition>, MatchError> {
        let started = Instant::now();
        let detections = match self.detector.detect(frame) {
            Ok(detections) => detections,
            Err(e) => {
                log::warn!("Face detection failed on frame {}: {e}", frame.index());
                Vec::new()
            }
        };
        self.logger.timing("detect", elapsed_ms(started));
        self.logger.metric("faces", detections.len() as f64);

        self.last_detections = detections;

        let started = Instant::now();
        let mut recognitions = Vec::with_capacity(self.last_detections.len());
        for detection in &self.last_detections {
            let outcome = match self.matcher.find_match(&detection.embedding, &self.identities) {
                Ok(outcome) => outcome,
                Err(MatchError::DegenerateVector) => {
                    log::warn!(
                        "Skipping face at {:?} on frame {}: degenerate embedding",
                        detection.bbox,
                        frame.index()
                    );
                    continue;
                }
                Err(e) => return Err(e),
            };
            recognitions.push(Recognition {
                bbox: detection.bbox,
                identity: Identity::from_match(outcome.name),
                score: outcome.score,
                emitted: false,
            });
        }
        self.logger.timing("match", elapsed_ms(started));

        let started = Instant::now();
        for recognition in &mut recognitions {
            let identity = &recognition.identity;
            if let Some(remaining) = self.throttler.remaining_cooldown(identity, now, self.cooldown) {
                log::debug!(
                    "Suppressed {identity} ({:.2}), {:.1}s cooldown remaining",
                    recognition.score,
                    remaining.as_secs_f64()
                );
                continue;
            }
            if !self.throttler.should_emit(identity, now, self.cooldown) {
                continue;
            }
            recognition.emitted = true;

            let event = RecognitionEvent::new(identity.clone(), recognition.score, now);
            for sink in &mut self.sinks {
                if let Err(e) = sink.notify(&event) {
                    log::warn!(
                        "Could not deliver {} event to {} sink: {e}",
                        event.identity,
                        sink.name()
                    );
                }
            }
        }
        self.logger.timing("notify", elapsed_ms(started));

        if let Some(snapshots) = &self.snapshots {
            if recognitions.iter().any(|r| r.emitted) {
                match snapshots.record(frame, &recognitions, now) {
                    Ok(path) => {
                        let labels: Vec<String> = recognitions.iter().map(overlay::label).collect();
                        log::debug!("Saved snapshot {}: {}", path.display(), labels.join(", "));
                    }
                    Err(e) => log::warn!("Could not save snapshot: {e}"),
                }
            }
        }

        Ok(recognitions)
    }

    /// Enrolls the largest face of the most recent frame under `name`.
    ///
    /// The record is persisted before it becomes matchable, so a failed
    /// write leaves both the store and the in-memory snapshot unchanged.
    pub fn enroll(&mut self, name: &str) -> Result<IdentityRecord, WatchError> {
        let face = FaceDetection::largest(&self.last_detections).ok_or(WatchError::NoFaceDetected)?;
        let record = IdentityRecord::new(name, face.embedding.clone())?;

        self.store.append(record.clone())?;
        self.identities.push(record.clone());
        self.logger.info(&format!(
            "Enrolled {} ({} identities)",
            record.name(),
            self.identities.len()
        ));
        Ok(record)
    }

    /// Drives the loop until the source ends or the operator quits.
    ///
    /// Operator commands are applied after each frame. A failed enrollment
    /// is logged and the loop continues. A dimension mismatch between the
    /// model and the store ends the loop with an error.
    pub fn run<I>(
        &mut self,
        mut frames: I,
        commands: &Receiver<OperatorCommand>,
    ) -> Result<RunSummary, WatchError>
    where
        I: Iterator<Item = FrameResult>,
    {
        let initial_identities = self.identities.len();
        let mut processed = 0;
        let mut events = 0;

        let stop = loop {
            let frame = match frames.next() {
                None => break StopReason::SourceExhausted,
                Some(Err(e)) => {
                    log::error!("Frame source failed: {e}");
                    break StopReason::SourceFailed(e.to_string());
                }
                Some(Ok(frame)) => frame,
            };

            let recognitions = self.process_frame(&frame, SystemTime::now())?;
            events += recognitions.iter().filter(|r| r.emitted).count();
            processed += 1;
            self.logger.frame_processed(processed);

            if self.apply_commands(commands) {
                break StopReason::Quit;
            }
        };

        self.logger.summary();
        Ok(RunSummary {
            frames: processed,
            events,
            enrolled: self.identities.len() - initial_identities,
            stop,
        })
    }

    /// Applies every pending command. Returns `true` when asked to quit.
    fn apply_commands(&mut self, commands: &Receiver<OperatorCommand>) -> bool {
        for command in commands.try_iter() {
            match command {
                OperatorCommand::Quit => {
                    self.logger.info("Quit requested");
                    return true;
                }
                OperatorCommand::Enroll(name) => {
                    if let Err(e) = self.enroll(&name) {
                        log::error!("Could not enroll {name}: {e}");
                    }
                }
            }
        }
        false
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::pipeline_logger::NullPipelineLogger;
    use crate::shared::bounding_box::BoundingBox;
    use crate::video::domain::image_writer::ImageWriter;
    use approx::assert_relative_eq;
    use std::collections::VecDeque;
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};
    use std::time::UNIX_EPOCH;

    // --- Stubs ---

    type DetectorScript = VecDeque<Result<Vec<FaceDetection>, String>>;

    /// Replays scripted results, then reports empty frames.
    struct StubDetector {
        script: DetectorScript,
    }

    impl FaceDetector for StubDetector {
        fn detect(
            &mut self,
            _frame: &Frame,
        ) -> Result<Vec<FaceDetection>, Box<dyn std::error::Error>> {
            match self.script.pop_front() {
                Some(Ok(detections)) => Ok(detections),
                Some(Err(msg)) => Err(msg.into()),
                None => Ok(Vec::new()),
            }
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        records: Arc<Mutex<Vec<IdentityRecord>>>,
        corrupt: bool,
        fail_writes: bool,
    }

    impl EmbeddingStore for MemoryStore {
        fn load(&self) -> Result<Vec<IdentityRecord>, StoreError> {
            if self.corrupt {
                return Err(StoreError::Corrupt {
                    path: PathBuf::from("memory"),
                    reason: "truncated".into(),
                });
            }
            Ok(self.records.lock().unwrap().clone())
        }

        fn append(&mut self, record: IdentityRecord) -> Result<(), StoreError> {
            if self.fail_writes {
                return Err(StoreError::Write {
                    path: PathBuf::from("memory"),
                    source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
                });
            }
            self.records.lock().unwrap().push(record);
            Ok(())
        }
    }

    struct RecordingSink {
        events: Arc<Mutex<Vec<RecognitionEvent>>>,
    }

    impl NotificationSink for RecordingSink {
        fn notify(&mut self, event: &RecognitionEvent) -> Result<(), Box<dyn std::error::Error>> {
            self.events.lock().unwrap().push(event.clone());
            Ok(())
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    struct FailingSink;

    impl NotificationSink for FailingSink {
        fn notify(&mut self, _event: &RecognitionEvent) -> Result<(), Box<dyn std::error::Error>> {
            Err("connection refused".into())
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    struct RecordingWriter {
        paths: Arc<Mutex<Vec<PathBuf>>>,
    }

    impl ImageWriter for RecordingWriter {
        fn write(&self, path: &Path, _frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
            self.paths.lock().unwrap().push(path.to_path_buf());
            Ok(())
        }
    }

    // --- Helpers ---

    struct Harness {
        use_case: WatchFacesUseCase,
        events: Arc<Mutex<Vec<RecognitionEvent>>>,
        stored: Arc<Mutex<Vec<IdentityRecord>>>,
    }

    fn record(name: &str, embedding: Vec<f32>) -> IdentityRecord {
        IdentityRecord::new(name, embedding).unwrap()
    }

    fn face(x: i32, size: i32, embedding: Vec<f32>) -> FaceDetection {
        FaceDetection {
            bbox: BoundingBox::new(x, 0, size, size),
            confidence: 0.9,
            embedding,
        }
    }

    /// Unit vector at `similarity` cosine to the x axis.
    fn at_similarity(similarity: f32) -> Vec<f32> {
        vec![similarity, (1.0 - similarity * similarity).sqrt()]
    }

    fn frame(index: usize) -> Frame {
        Frame::new(vec![0; 4 * 4 * 3], 4, 4, 3, index)
    }

    fn t(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(1_700_000_000 + secs)
    }

    fn harness_with(
        enrolled: Vec<IdentityRecord>,
        script: Vec<Result<Vec<FaceDetection>, String>>,
        store_fails: bool,
        extra_sinks: Vec<Box<dyn NotificationSink>>,
        snapshots: Option<SnapshotRecorder>,
    ) -> Harness {
        let stored = Arc::new(Mutex::new(enrolled));
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut sinks = extra_sinks;
        sinks.push(Box::new(RecordingSink {
            events: events.clone(),
        }));

        let use_case = WatchFacesUseCase::new(
            Box::new(StubDetector {
                script: script.into(),
            }),
            Box::new(MemoryStore {
                records: stored.clone(),
                corrupt: false,
                fail_writes: store_fails,
            }),
            SimilarityMatcher::new(0.5),
            Duration::from_secs(5),
            sinks,
            snapshots,
            Box::new(NullPipelineLogger),
        )
        .unwrap();

        Harness {
            use_case,
            events,
            stored,
        }
    }

    fn harness(
        enrolled: Vec<IdentityRecord>,
        script: Vec<Result<Vec<FaceDetection>, String>>,
    ) -> Harness {
        harness_with(enrolled, script, false, Vec::new(), None)
    }

    fn bob() -> IdentityRecord {
        record("bob", vec![1.0, 0.0])
    }

    fn ok_frames(count: usize) -> Vec<FrameResult> {
        (0..count).map(|i| Ok(frame(i))).collect()
    }

    // --- Construction ---

    #[test]
    fn test_corrupt_store_is_fatal_at_startup() {
        let result = WatchFacesUseCase::new(
            Box::new(StubDetector {
                script: VecDeque::new(),
            }),
            Box::new(MemoryStore {
                corrupt: true,
                ..MemoryStore::default()
            }),
            SimilarityMatcher::new(0.5),
            Duration::from_secs(5),
            Vec::new(),
            None,
            Box::new(NullPipelineLogger),
        );
        assert!(matches!(
            result,
            Err(WatchError::Store(StoreError::Corrupt { .. }))
        ));
    }

    #[test]
    fn test_loads_identities_snapshot() {
        let h = harness(vec![bob(), record("alice", vec![0.0, 1.0])], vec![]);
        let names: Vec<_> = h.use_case.identities().iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["bob", "alice"]);
    }

    // --- process_frame ---

    #[test]
    fn test_known_face_is_recognized_and_emitted() {
        let mut h = harness(vec![bob()], vec![Ok(vec![face(0, 20, at_similarity(0.8))])]);

        let recognitions = h.use_case.process_frame(&frame(0), t(0)).unwrap();

        assert_eq!(recognitions.len(), 1);
        assert_eq!(recognitions[0].identity, Identity::known("bob"));
        assert_relative_eq!(recognitions[0].score, 0.8, epsilon = 1e-5);
        assert!(recognitions[0].emitted);

        let events = h.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].identity, Identity::known("bob"));
        assert_eq!(events[0].timestamp, t(0));
    }

    #[test]
    fn test_face_below_threshold_is_unknown_with_score() {
        let mut h = harness(vec![bob()], vec![Ok(vec![face(0, 20, at_similarity(0.3))])]);

        let recognitions = h.use_case.process_frame(&frame(0), t(0)).unwrap();

        assert_eq!(recognitions[0].identity, Identity::Unknown);
        assert_relative_eq!(recognitions[0].score, 0.3, epsilon = 1e-5);
        let events = h.events.lock().unwrap();
        assert_eq!(events[0].identity.wire_name(), "unknown");
    }

    #[test]
    fn test_empty_store_reports_every_face_unknown() {
        let mut h = harness(vec![], vec![Ok(vec![face(0, 20, vec![0.2, 0.9])])]);

        let recognitions = h.use_case.process_frame(&frame(0), t(0)).unwrap();

        assert_eq!(recognitions[0].identity, Identity::Unknown);
        assert_relative_eq!(recognitions[0].score, -1.0);
    }

    #[test]
    fn test_frame_without_faces_produces_no_events() {
        let mut h = harness(vec![bob()], vec![Ok(vec![])]);
        let recognitions = h.use_case.process_frame(&frame(0), t(0)).unwrap();
        assert!(recognitions.is_empty());
        assert!(h.events.lock().unwrap().is_empty());
    }

    #[test]
    fn test_detector_failure_counts_as_empty_frame() {
        let mut h = harness(
            vec![bob()],
            vec![Err("inference failed".into()), Ok(vec![face(0, 20, vec![1.0, 0.0])])],
        );

        assert!(h.use_case.process_frame(&frame(0), t(0)).unwrap().is_empty());
        let recognitions = h.use_case.process_frame(&frame(1), t(1)).unwrap();
        assert_eq!(recognitions[0].identity, Identity::known("bob"));
    }

    #[test]
    fn test_cooldown_suppresses_until_elapsed() {
        let bob_face = || Ok(vec![face(0, 20, vec![1.0, 0.0])]);
        let mut h = harness(vec![bob()], vec![bob_face(), bob_face(), bob_face()]);

        let first = h.use_case.process_frame(&frame(0), t(0)).unwrap();
        let second = h.use_case.process_frame(&frame(1), t(2)).unwrap();
        let third = h.use_case.process_frame(&frame(2), t(5)).unwrap();

        assert!(first[0].emitted);
        assert!(!second[0].emitted);
        assert_eq!(second[0].identity, Identity::known("bob"));
        assert!(third[0].emitted);

        let events = h.events.lock().unwrap();
        let times: Vec<_> = events.iter().map(|e| e.timestamp).collect();
        assert_eq!(times, vec![t(0), t(5)]);
    }

    #[test]
    fn test_buckets_are_independent() {
        let alice = record("alice", vec![0.0, 1.0]);
        let mut h = harness(
            vec![bob(), alice],
            vec![
                Ok(vec![face(0, 20, vec![1.0, 0.0])]),
                Ok(vec![
                    face(0, 20, vec![1.0, 0.0]),
                    face(30, 20, vec![0.0, 1.0]),
                    face(60, 20, vec![-1.0, -1.0]),
                ]),
            ],
        );

        h.use_case.process_frame(&frame(0), t(0)).unwrap();
        let second = h.use_case.process_frame(&frame(1), t(1)).unwrap();

        let emitted: Vec<_> = second.iter().map(|r| (r.identity.clone(), r.emitted)).collect();
        assert_eq!(
            emitted,
            vec![
                (Identity::known("bob"), false),
                (Identity::known("alice"), true),
                (Identity::Unknown, true),
            ]
        );
    }

    #[test]
    fn test_unknown_faces_share_one_bucket() {
        let mut h = harness(
            vec![bob()],
            vec![Ok(vec![face(0, 20, vec![-1.0, 0.0]), face(30, 20, vec![0.0, -1.0])])],
        );

        let recognitions = h.use_case.process_frame(&frame(0), t(0)).unwrap();

        assert!(recognitions[0].emitted);
        assert!(!recognitions[1].emitted);
        assert_eq!(h.events.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_failing_sink_does_not_block_other_sinks() {
        let bob_face = || Ok(vec![face(0, 20, vec![1.0, 0.0])]);
        let mut h = harness_with(
            vec![bob()],
            vec![bob_face(), bob_face()],
            false,
            vec![Box::new(FailingSink)],
            None,
        );

        assert!(h.use_case.process_frame(&frame(0), t(0)).is_ok());
        assert!(h.use_case.process_frame(&frame(1), t(10)).is_ok());
        assert_eq!(h.events.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_degenerate_face_is_skipped() {
        let mut h = harness(vec![bob()], vec![Ok(vec![face(0, 20, vec![0.0, 0.0])])]);
        assert_eq!(h.use_case.process_frame(&frame(0), t(0)), Ok(Vec::new()));
        assert!(h.events.lock().unwrap().is_empty());
    }

    #[test]
    fn test_degenerate_face_does_not_hide_others_in_frame() {
        let mut h = harness(
            vec![bob()],
            vec![
                Ok(vec![face(0, 20, vec![0.0, 1.0])]),
                Ok(vec![face(0, 50, vec![1.0, 0.0]), face(60, 10, vec![0.0, 0.0])]),
            ],
        );

        h.use_case.process_frame(&frame(0), t(0)).unwrap();
        let recognitions = h.use_case.process_frame(&frame(1), t(1)).unwrap();

        assert_eq!(recognitions.len(), 1);
        assert_eq!(recognitions[0].identity, Identity::known("bob"));
        assert!(recognitions[0].emitted);
        let events = h.events.lock().unwrap().clone();
        assert_eq!(events.last().map(|e| e.identity.clone()), Some(Identity::known("bob")));

        let enrolled = h.use_case.enroll("erin").unwrap();
        assert_eq!(enrolled.embedding(), &[1.0, 0.0]);
    }

    #[test]
    fn test_latest_faces_kept_when_frame_errors() {
        let mut h = harness(
            vec![bob()],
            vec![
                Ok(vec![face(0, 20, vec![0.0, 1.0])]),
                Ok(vec![face(0, 40, vec![0.6, 0.8, 0.0])]),
            ],
        );

        h.use_case.process_frame(&frame(0), t(0)).unwrap();
        assert!(h.use_case.process_frame(&frame(1), t(1)).is_err());

        assert_eq!(h.use_case.last_detections.len(), 1);
        assert_eq!(h.use_case.last_detections[0].embedding, vec![0.6, 0.8, 0.0]);
    }

    #[test]
    fn test_dimension_mismatch_is_an_error() {
        let mut h = harness(vec![bob()], vec![Ok(vec![face(0, 20, vec![1.0, 0.0, 0.0])])]);
        assert_eq!(
            h.use_case.process_frame(&frame(0), t(0)),
            Err(MatchError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        );
    }

    #[test]
    fn test_snapshot_written_only_when_emitted() {
        let paths = Arc::new(Mutex::new(Vec::new()));
        let recorder = SnapshotRecorder::new(
            "/tmp/snaps",
            Box::new(RecordingWriter {
                paths: paths.clone(),
            }),
        );
        let bob_face = || Ok(vec![face(0, 2, vec![1.0, 0.0])]);
        let mut h = harness_with(
            vec![bob()],
            vec![bob_face(), bob_face(), Ok(vec![])],
            false,
            Vec::new(),
            Some(recorder),
        );

        h.use_case.process_frame(&frame(0), t(0)).unwrap();
        h.use_case.process_frame(&frame(1), t(1)).unwrap();
        h.use_case.process_frame(&frame(2), t(2)).unwrap();

        let paths = paths.lock().unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(
            paths[0],
            PathBuf::from("/tmp/snaps").join(format!(
                "{}_000000.png",
                crate::notification::domain::recognition_event::unix_seconds(t(0))
            ))
        );
    }

    // --- enroll ---

    #[test]
    fn test_enroll_uses_largest_face_of_latest_frame() {
        let mut h = harness(
            vec![],
            vec![Ok(vec![face(0, 10, vec![0.0, 1.0]), face(20, 40, vec![1.0, 0.0])])],
        );
        h.use_case.process_frame(&frame(0), t(0)).unwrap();

        let enrolled = h.use_case.enroll("  carol ").unwrap();

        assert_eq!(enrolled.name(), "carol");
        assert_eq!(enrolled.embedding(), &[1.0, 0.0]);
        assert_eq!(h.stored.lock().unwrap().as_slice(), &[enrolled.clone()]);
        assert_eq!(h.use_case.identities(), &[enrolled]);
    }

    #[test]
    fn test_enrolled_face_matches_next_frame() {
        let carol_face = || Ok(vec![face(0, 20, vec![0.6, 0.8])]);
        let mut h = harness(vec![], vec![carol_face(), carol_face()]);

        let before = h.use_case.process_frame(&frame(0), t(0)).unwrap();
        h.use_case.enroll("carol").unwrap();
        let after = h.use_case.process_frame(&frame(1), t(1)).unwrap();

        assert_eq!(before[0].identity, Identity::Unknown);
        assert_eq!(after[0].identity, Identity::known("carol"));
        assert_relative_eq!(after[0].score, 1.0, epsilon = 1e-6);
        assert!(after[0].emitted);
    }

    #[test]
    fn test_duplicate_names_both_persist_and_match() {
        let mut h = harness(
            vec![],
            vec![Ok(vec![face(0, 20, vec![1.0, 0.0])]), Ok(vec![face(0, 20, vec![0.0, 1.0])])],
        );

        h.use_case.process_frame(&frame(0), t(0)).unwrap();
        h.use_case.enroll("dave").unwrap();
        h.use_case.process_frame(&frame(1), t(1)).unwrap();
        h.use_case.enroll("dave").unwrap();

        assert_eq!(h.stored.lock().unwrap().len(), 2);
        let outcome = SimilarityMatcher::new(0.5)
            .find_match(&[0.0, 1.0], h.use_case.identities())
            .unwrap();
        assert_eq!(outcome.name.as_deref(), Some("dave"));
        assert_relative_eq!(outcome.score, 1.0);
    }

    #[test]
    fn test_enroll_without_faces_fails() {
        let mut h = harness(vec![], vec![Ok(vec![])]);
        h.use_case.process_frame(&frame(0), t(0)).unwrap();

        assert!(matches!(h.use_case.enroll("erin"), Err(WatchError::NoFaceDetected)));
        assert!(h.stored.lock().unwrap().is_empty());
    }

    #[test]
    fn test_enroll_write_failure_leaves_snapshot_unchanged() {
        let mut h = harness_with(
            vec![bob()],
            vec![Ok(vec![face(0, 20, vec![0.0, 1.0])])],
            true,
            Vec::new(),
            None,
        );
        h.use_case.process_frame(&frame(0), t(0)).unwrap();

        let result = h.use_case.enroll("frank");

        assert!(matches!(result, Err(WatchError::Store(StoreError::Write { .. }))));
        assert_eq!(h.use_case.identities(), &[bob()]);
    }

    #[test]
    fn test_enroll_rejects_blank_name() {
        let mut h = harness(vec![], vec![Ok(vec![face(0, 20, vec![1.0, 0.0])])]);
        h.use_case.process_frame(&frame(0), t(0)).unwrap();

        assert!(matches!(
            h.use_case.enroll("   "),
            Err(WatchError::Identity(IdentityError::EmptyName))
        ));
    }

    // --- run ---

    #[test]
    fn test_run_stops_when_source_is_exhausted() {
        let mut h = harness(vec![bob()], vec![Ok(vec![face(0, 20, vec![1.0, 0.0])])]);
        let (_tx, rx) = crossbeam_channel::unbounded();

        let summary = h.use_case.run(ok_frames(3).into_iter(), &rx).unwrap();

        assert_eq!(
            summary,
            RunSummary {
                frames: 3,
                events: 1,
                enrolled: 0,
                stop: StopReason::SourceExhausted,
            }
        );
    }

    #[test]
    fn test_run_stops_on_source_failure() {
        let mut h = harness(vec![], vec![]);
        let (_tx, rx) = crossbeam_channel::unbounded();
        let frames: Vec<FrameResult> = vec![Ok(frame(0)), Err("device unplugged".into()), Ok(frame(2))];

        let summary = h.use_case.run(frames.into_iter(), &rx).unwrap();

        assert_eq!(summary.frames, 1);
        assert_eq!(
            summary.stop,
            StopReason::SourceFailed("device unplugged".into())
        );
    }

    #[test]
    fn test_run_quits_after_current_frame() {
        let mut h = harness(vec![], vec![]);
        let (tx, rx) = crossbeam_channel::unbounded();
        tx.send(OperatorCommand::Quit).unwrap();

        let summary = h.use_case.run(ok_frames(5).into_iter(), &rx).unwrap();

        assert_eq!(summary.frames, 1);
        assert_eq!(summary.stop, StopReason::Quit);
    }

    #[test]
    fn test_run_applies_enrollment_between_frames() {
        let face_of = || Ok(vec![face(0, 20, vec![0.6, 0.8])]);
        let mut h = harness(vec![], vec![face_of(), face_of()]);
        let (tx, rx) = crossbeam_channel::unbounded();
        tx.send(OperatorCommand::Enroll("grace".into())).unwrap();

        let summary = h.use_case.run(ok_frames(2).into_iter(), &rx).unwrap();

        assert_eq!(summary.enrolled, 1);
        // Unknown on frame 0, grace on frame 1: separate buckets, both emitted.
        let events = h.events.lock().unwrap();
        let identities: Vec<_> = events.iter().map(|e| e.identity.clone()).collect();
        assert_eq!(identities, vec![Identity::Unknown, Identity::known("grace")]);
    }

    #[test]
    fn test_run_survives_failed_enrollment() {
        let mut h = harness(vec![], vec![]);
        let (tx, rx) = crossbeam_channel::unbounded();
        tx.send(OperatorCommand::Enroll("nobody".into())).unwrap();

        let summary = h.use_case.run(ok_frames(3).into_iter(), &rx).unwrap();

        assert_eq!(summary.frames, 3);
        assert_eq!(summary.enrolled, 0);
        assert_eq!(summary.stop, StopReason::SourceExhausted);
    }

    #[test]
    fn test_run_skips_degenerate_faces() {
        let mut h = harness(
            vec![bob()],
            vec![
                Ok(vec![face(0, 20, vec![0.0, 0.0])]),
                Ok(vec![face(0, 20, vec![1.0, 0.0])]),
            ],
        );
        let (_tx, rx) = crossbeam_channel::unbounded();

        let summary = h.use_case.run(ok_frames(2).into_iter(), &rx).unwrap();

        assert_eq!(summary.frames, 2);
        assert_eq!(summary.events, 1);
    }

    #[test]
    fn test_run_ends_on_dimension_mismatch() {
        let mut h = harness(vec![bob()], vec![Ok(vec![face(0, 20, vec![1.0; 3])])]);
        let (_tx, rx) = crossbeam_channel::unbounded();

        let result = h.use_case.run(ok_frames(2).into_iter(), &rx);

        assert!(matches!(
            result,
            Err(WatchError::Match(MatchError::DimensionMismatch { .. }))
        ));
    }

    #[test]
    fn test_run_ignores_closed_command_channel() {
        let mut h = harness(vec![], vec![]);
        let (tx, rx) = crossbeam_channel::unbounded::<OperatorCommand>();
        drop(tx);

        let summary = h.use_case.run(ok_frames(4).into_iter(), &rx).unwrap();

        assert_eq!(summary.frames, 4);
        assert_eq!(summary.stop, StopReason::SourceExhausted);
    }
}
