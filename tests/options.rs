// Licensed under the Apache License, Version 2.0 (the "License"); you may
// not use this file except in compliance with the License. You may obtain
// a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied. See the
// License for the specific language governing permissions and limitations
// under the License.

mod common;

use rustworkx_community::community::{
    build_rng, leiden_detailed_with_rng, louvain_detailed, louvain_with_rng, FnSource,
    LeidenOptions, LouvainOptions, ModularityOptions,
};

use common::{clique_ring, two_triangles};

#[test]
fn options_survive_a_json_round_trip() {
    let louvain = LouvainOptions::new()
        .with_resolution(0.8)
        .with_fast_local_moves(false)
        .with_weighted(true)
        .with_weight_attribute("w")
        .with_seed(12);
    let text = serde_json::to_string(&louvain).unwrap();
    assert!(text.contains("\"fastLocalMoves\":false"));
    let back: LouvainOptions = serde_json::from_str(&text).unwrap();
    assert_eq!(back, louvain);

    let leiden = LeidenOptions::new().with_randomness(0.05).with_community_attribute("c");
    let text = serde_json::to_string(&leiden).unwrap();
    let back: LeidenOptions = serde_json::from_str(&text).unwrap();
    assert_eq!(back, leiden);

    let metric: ModularityOptions =
        serde_json::from_str(r#"{"resolution": 2.0, "weightAttribute": "w"}"#).unwrap();
    assert_eq!(metric.resolution, 2.0);
    assert_eq!(metric.weight_attribute, "w");
    assert!(!metric.weighted);
}

#[test]
fn configured_run_from_json() {
    let options: LouvainOptions =
        serde_json::from_str(r#"{"randomWalk": false, "resolution": 0.1}"#).unwrap();
    let report = louvain_detailed(&clique_ring(), &options).unwrap();
    assert_eq!(report.count, 1);
    assert_eq!(report.resolution, 0.1);
}

#[test]
fn injected_sources_drive_the_run() {
    let graph = two_triangles();
    let options = LouvainOptions::new();

    let mut constant = FnSource(|| 0.5);
    let first = louvain_with_rng(&graph, &options, &mut constant).unwrap();
    let mut constant = FnSource(|| 0.5);
    let second = louvain_with_rng(&graph, &options, &mut constant).unwrap();
    assert_eq!(first, second);

    let mut seeded = build_rng(Some(3));
    let leiden = leiden_detailed_with_rng(&graph, &LeidenOptions::new(), &mut seeded).unwrap();
    let mut reseeded = build_rng(Some(3));
    let again = leiden_detailed_with_rng(&graph, &LeidenOptions::new(), &mut reseeded).unwrap();
    assert_eq!(leiden.communities, again.communities);
    assert_eq!(leiden.count, 2);
}
